//! Blend presets for 2D batches.

/// How a batch's output combines with the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Blending off; source overwrites the target.
    Disabled,
    /// `src.rgb * src.a + dst.rgb * (1 - src.a)`.
    #[default]
    Alpha,
    /// `src.rgb + dst.rgb * (1 - src.a)`.
    PremultipliedAlpha,
    /// `src.rgb * src.a + dst.rgb`. Glows and particles.
    Additive,
    /// `src.rgb * dst.rgb`.
    Multiply,
    /// `(1 - dst.rgb) * src.rgb`. Highlights that invert what is below.
    Inverted,
    Custom(wgpu::BlendState),
}

impl BlendMode {
    /// The pipeline blend state, or `None` when blending is off.
    pub fn to_blend_state(self) -> Option<wgpu::BlendState> {
        use wgpu::{BlendComponent, BlendFactor, BlendOperation, BlendState};

        let component = |src_factor, dst_factor| BlendComponent {
            src_factor,
            dst_factor,
            operation: BlendOperation::Add,
        };

        match self {
            BlendMode::Disabled => None,
            BlendMode::Alpha => Some(BlendState::ALPHA_BLENDING),
            BlendMode::PremultipliedAlpha => Some(BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            BlendMode::Additive => Some(BlendState {
                color: component(BlendFactor::SrcAlpha, BlendFactor::One),
                alpha: component(BlendFactor::One, BlendFactor::One),
            }),
            BlendMode::Multiply => Some(BlendState {
                color: component(BlendFactor::Dst, BlendFactor::Zero),
                alpha: component(BlendFactor::DstAlpha, BlendFactor::Zero),
            }),
            BlendMode::Inverted => Some(BlendState {
                color: component(BlendFactor::OneMinusDst, BlendFactor::Zero),
                alpha: component(BlendFactor::One, BlendFactor::Zero),
            }),
            BlendMode::Custom(state) => Some(state),
        }
    }
}
