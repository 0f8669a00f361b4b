use chrono::{DateTime, Utc};

/// Immutable payload carried through the topic fabric.
///
/// Every message keeps three views of the same value: the raw bytes, the
/// UTF-8 text decoded from them, and an opportunistic numeric reading of the
/// text. Text that does not parse as a double reads as the NaN sentinel.
#[derive(Debug, Clone)]
pub struct Message {
    data: Vec<u8>,
    text: String,
    num: f64,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let text = String::from_utf8_lossy(&data).into_owned();
        let num = parse_num(&text);
        Self {
            data,
            text,
            num,
            created_at: Utc::now(),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            num: parse_num(&text),
            data: text.clone().into_bytes(),
            text,
            created_at: Utc::now(),
        }
    }

    /// The text view is the `{:?}` rendering of the double, so integral
    /// values keep their trailing `.0` and text↔num round-trips.
    pub fn from_num(value: f64) -> Self {
        Self::from_text(format!("{value:?}"))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn num(&self) -> f64 {
        self.num
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn parse_num(text: &str) -> f64 {
    text.trim().parse().unwrap_or(f64::NAN)
}
