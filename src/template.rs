use std::fmt;

/// Value placeholders understood by message templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `{PLAYERNAME}`
    PlayerName,
    /// `{GEOINFO}`
    GeoInfo,
}

impl Placeholder {
    pub const ALL: [Placeholder; 2] = [Placeholder::PlayerName, Placeholder::GeoInfo];

    /// The name between the braces.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Placeholder::PlayerName => "PLAYERNAME",
            Placeholder::GeoInfo => "GEOINFO",
        }
    }

    fn from_name(name: &str) -> Option<Placeholder> {
        Placeholder::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// A pre-compiled message template.
///
/// Only `{PLAYERNAME}` and `{GEOINFO}` are fields; every other brace group,
/// including color mnemonics such as `{RED}`, stays literal so a later pass
/// can handle it.
///
/// Rendering is a single left-to-right pass that concatenates segments, so a
/// substituted value that itself contains `{GEOINFO}` is not expanded again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    parts: Vec<TemplatePart>,
    /// Pre-computed estimate of output size for allocation.
    estimated_size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Field(Placeholder),
}

impl Template {
    /// Compile a template string. Never fails: anything that is not a known
    /// placeholder is kept verbatim.
    #[must_use]
    pub fn compile(template: &str) -> Template {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut estimated_size = 0;
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            // A field is `{NAME}` where NAME holds no further brace.
            let field = after
                .find(['{', '}'])
                .filter(|&end| after.as_bytes()[end] == b'}')
                .and_then(|end| Placeholder::from_name(&after[..end]).map(|p| (p, end)));

            match field {
                Some((placeholder, end)) => {
                    if !literal.is_empty() {
                        estimated_size += literal.len();
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    // Player names and locations are short.
                    estimated_size += 24;
                    parts.push(TemplatePart::Field(placeholder));
                    rest = &after[end + 1..];
                }
                None => {
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);

        if !literal.is_empty() {
            estimated_size += literal.len();
            parts.push(TemplatePart::Literal(literal));
        }

        Template {
            parts,
            estimated_size,
        }
    }

    /// Render the template using a closure to look up placeholder values.
    #[inline]
    pub fn render<'a>(&self, mut lookup: impl FnMut(Placeholder) -> &'a str) -> String {
        let mut output = String::with_capacity(self.estimated_size);
        for part in &self.parts {
            match part {
                TemplatePart::Literal(s) => output.push_str(s),
                TemplatePart::Field(p) => output.push_str(lookup(*p)),
            }
        }
        output
    }

    /// Whether `placeholder` appears anywhere in the template.
    #[must_use]
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, TemplatePart::Field(p) if *p == placeholder))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(s) => write!(f, "{s}")?,
                TemplatePart::Field(p) => write!(f, "{{{}}}", p.name())?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Template {
    fn from(s: &str) -> Self {
        Template::compile(s)
    }
}
