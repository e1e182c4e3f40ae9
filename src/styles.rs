// Styling for the overlay and the settings panel

use iced::theme::Palette;
use iced::widget::{container, text};
use iced::{Color, Theme};

/// Theme of the overlay window.
/// The window clear color comes from the palette background, so a transparent
/// background here is what makes the desktop show through around the text.
pub fn overlay_theme() -> Theme {
    Theme::custom(
        "deskstat overlay".to_string(),
        Palette {
            background: Color::TRANSPARENT,
            ..Palette::DARK
        },
    )
}

/// Theme of the settings window
pub fn panel_theme() -> Theme {
    Theme::Dark
}

/// Fully transparent, borderless box behind the overlay text
pub fn overlay_backdrop(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(iced::Background::Color(Color::TRANSPARENT)),
        border: iced::Border {
            width: 0.0,
            color: Color::TRANSPARENT,
            radius: iced::border::Radius::default(),
        },
        ..Default::default()
    }
}

/// Confirmation under the settings form
pub fn status_ok(theme: &Theme) -> text::Style {
    text::Style {
        color: Some(theme.palette().success),
    }
}

/// One rejected field under the settings form
pub fn status_error(theme: &Theme) -> text::Style {
    text::Style {
        color: Some(theme.palette().danger),
    }
}
