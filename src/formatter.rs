use crate::color::ColorTable;
use crate::template::{Placeholder, Template};

/// Fills message templates and maps color mnemonics for one output channel.
///
/// Formatting is pure: the same inputs always give the same output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageFormatter {
    colors: ColorTable,
}

impl MessageFormatter {
    #[must_use]
    pub fn new(colors: ColorTable) -> Self {
        Self { colors }
    }

    #[must_use]
    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    /// Substitute `{PLAYERNAME}` and `{GEOINFO}` in `template`, then apply the
    /// color table to the result.
    #[must_use]
    pub fn format(&self, template: &str, player_name: &str, geo_info: &str) -> String {
        self.render(&Template::compile(template), player_name, geo_info)
    }

    /// Same as [`format`](Self::format) for an already compiled template.
    #[must_use]
    pub fn render(&self, template: &Template, player_name: &str, geo_info: &str) -> String {
        let filled = template.render(|p| match p {
            Placeholder::PlayerName => player_name,
            Placeholder::GeoInfo => geo_info,
        });
        self.colors.apply(&filled)
    }
}
