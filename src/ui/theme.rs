use ratatui::style::Color;

/// Palette used by rendering code.
#[derive(Clone, Copy)]
pub struct Theme {
    /// Canvas background.
    pub base: Color,
    /// Card background.
    pub surface: Color,
    /// Unfocused borders and captions.
    pub overlay: Color,
    /// Primary text.
    pub text: Color,
    /// Secondary text.
    pub subtext: Color,
    /// Focus highlight.
    pub accent: Color,
    /// Installed and success states.
    pub green: Color,
    /// In-progress states.
    pub yellow: Color,
    /// Errors.
    pub red: Color,
}

const MOCHA: Theme = Theme {
    base: Color::Rgb(0x1e, 0x1e, 0x2e),
    surface: Color::Rgb(0x31, 0x32, 0x44),
    overlay: Color::Rgb(0x7f, 0x84, 0x9c),
    text: Color::Rgb(0xcd, 0xd6, 0xf4),
    subtext: Color::Rgb(0xa6, 0xad, 0xc8),
    accent: Color::Rgb(0x74, 0xc7, 0xec),
    green: Color::Rgb(0xa6, 0xe3, 0xa1),
    yellow: Color::Rgb(0xf9, 0xe2, 0xaf),
    red: Color::Rgb(0xf3, 0x8b, 0xa8),
};

/// The active palette.
#[must_use]
pub const fn theme() -> Theme {
    MOCHA
}
