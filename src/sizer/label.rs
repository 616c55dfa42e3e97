use std::fmt::{Display, Formatter};

/// Size bucket of a pull request, ordered from the smallest to the largest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeLabel {
    XS,
    S,
    M,
    L,
    XL,
    XXL,
}

impl SizeLabel {
    pub const ALL: [SizeLabel; 6] = [
        SizeLabel::XS,
        SizeLabel::S,
        SizeLabel::M,
        SizeLabel::L,
        SizeLabel::XL,
        SizeLabel::XXL,
    ];

    /// Name of the label as it appears on GitHub.
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeLabel::XS => "size/XS",
            SizeLabel::S => "size/S",
            SizeLabel::M => "size/M",
            SizeLabel::L => "size/L",
            SizeLabel::XL => "size/XL",
            SizeLabel::XXL => "size/XXL",
        }
    }

    /// Recognizes a size label among arbitrary PR labels.
    ///
    /// GitHub label names are case-insensitive, so `size/m` is the same label as `size/M`.
    /// Labels that merely share the prefix (e.g. `size/huge`) are left alone.
    pub fn parse(label: &str) -> Option<SizeLabel> {
        SizeLabel::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(label))
    }
}

impl Display for SizeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
