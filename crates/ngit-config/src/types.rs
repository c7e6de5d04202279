/// `core.autocrlf` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoCrlf {
    /// No conversion.
    #[default]
    False,
    /// Normalize on write, denormalize on checkout.
    True,
    /// Normalize on write only.
    Input,
}

impl AutoCrlf {
    /// Whether content should be normalized on the hash/write path.
    pub fn normalizes_on_write(self) -> bool {
        matches!(self, Self::True | Self::Input)
    }
}

/// Parse git's boolean notation. `None` for unrecognized values.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}
