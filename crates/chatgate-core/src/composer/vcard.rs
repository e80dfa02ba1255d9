//! Minimal vCard 3.0 writer for contact and business-card messages.

/// Builder for a single vCard.
#[derive(Debug, Clone)]
pub struct VCard {
    lines: Vec<String>,
}

impl VCard {
    pub fn new(full_name: &str) -> Self {
        Self {
            lines: vec![format!("FN:{}", escape(full_name))],
        }
    }

    /// Add a mobile number. `digits` must already be reduced to digits.
    pub fn phone(mut self, digits: &str) -> Self {
        self.lines
            .push(format!("TEL;type=CELL;type=VOICE;waid={digits}:+{digits}"));
        self
    }

    pub fn organization(self, value: Option<&str>) -> Self {
        self.field("ORG", value)
    }

    pub fn title(self, value: Option<&str>) -> Self {
        self.field("TITLE", value)
    }

    pub fn email(self, value: Option<&str>) -> Self {
        self.field("EMAIL;type=INTERNET", value)
    }

    pub fn website(self, value: Option<&str>) -> Self {
        self.field("URL", value)
    }

    pub fn address(mut self, value: Option<&str>) -> Self {
        if let Some(address) = value {
            self.lines
                .push(format!("ADR;type=WORK:;;{};;;;", escape(address)));
        }
        self
    }

    fn field(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.lines.push(format!("{name}:{}", escape(value)));
        }
        self
    }

    pub fn build(self) -> String {
        let mut out = String::from("BEGIN:VCARD\nVERSION:3.0\n");
        for line in self.lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("END:VCARD");
        out
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}
