//! Display formatting for merged values.
//!
//! Values are stored raw. A format only attaches a number-format pattern to
//! the cell's style, in the rendering surface's slot `s.n.pattern`, so the
//! value stays editable and recomputable in the host engine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Style key holding the number format.
const NUMBER_FORMAT_KEY: &str = "n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Currency,
    Number,
    Percentage,
    Date,
}

impl FormatKind {
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Currency => "$#,##0.00",
            Self::Number => "#,##0.00",
            Self::Percentage => "0.00%",
            Self::Date => "yyyy-mm-dd",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::Number => "number",
            Self::Percentage => "percentage",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "currency" => Ok(Self::Currency),
            "number" => Ok(Self::Number),
            "percentage" | "percent" => Ok(Self::Percentage),
            "date" => Ok(Self::Date),
            other => Err(format!("unknown format {other:?} (expected currency, number, percentage, date)")),
        }
    }
}

fn number_format(kind: FormatKind) -> Value {
    json!({ "pattern": kind.pattern() })
}

/// Composes the style written on a merged cell from the template style and
/// the mapping's format.
///
/// Style ids (strings) refer to the workbook `styles` table. Formatting one
/// registers a derived entry `"<id>-<kind>"` once, copied from the referenced
/// entry with the number format set, and the cell refers to that id. A
/// different entry already stored under that id is left alone and the
/// derived entry takes `"<id>-<kind>-2"`, `"-3"`, and so on.
#[derive(Debug, Default)]
pub struct StyleComposer {
    derived: HashMap<(String, FormatKind), String>,
    pending: Vec<(String, Value)>,
    inline_only: bool,
}

impl StyleComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composer for workbooks whose style table cannot take new entries.
    /// Formatting a style id then yields an inline style instead.
    pub fn inline_only() -> Self {
        Self { inline_only: true, ..Self::default() }
    }

    /// Style for one written cell. `styles` is the workbook style table as it
    /// was before the merge; new entries are queued and applied by
    /// [`StyleComposer::commit`].
    pub fn compose(
        &mut self,
        template: Option<&Value>,
        format: Option<FormatKind>,
        styles: Option<&Map<String, Value>>,
    ) -> Option<Value> {
        let Some(kind) = format else {
            return template.cloned();
        };

        match template {
            None => Some(json!({ NUMBER_FORMAT_KEY: number_format(kind) })),
            Some(Value::Object(inline)) => {
                let mut style = inline.clone();
                style.insert(NUMBER_FORMAT_KEY.into(), number_format(kind));
                Some(Value::Object(style))
            }
            Some(Value::String(id)) if !self.inline_only => {
                Some(Value::String(self.derive(id, kind, styles)))
            }
            // Not a shape we can extend; the format wins.
            Some(_) => Some(json!({ NUMBER_FORMAT_KEY: number_format(kind) })),
        }
    }

    fn derive(&mut self, id: &str, kind: FormatKind, styles: Option<&Map<String, Value>>) -> String {
        if let Some(existing) = self.derived.get(&(id.to_string(), kind)) {
            return existing.clone();
        }

        let mut entry = styles
            .and_then(|s| s.get(id))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        entry.insert(NUMBER_FORMAT_KEY.into(), number_format(kind));
        let entry = Value::Object(entry);

        // An existing entry under the candidate id is reused only when it is
        // identical; otherwise the next free suffix is taken.
        let base = format!("{id}-{kind}");
        let mut derived_id = base.clone();
        let mut suffix = 1u32;
        loop {
            let existing = styles
                .and_then(|s| s.get(&derived_id))
                .or_else(|| self.pending.iter().find(|(k, _)| *k == derived_id).map(|(_, v)| v))
                .cloned();
            match existing {
                None => {
                    self.pending.push((derived_id.clone(), entry));
                    break;
                }
                Some(found) if found == entry => break,
                Some(_) => {
                    suffix += 1;
                    derived_id = format!("{base}-{suffix}");
                }
            }
        }

        self.derived.insert((id.to_string(), kind), derived_id.clone());
        derived_id
    }

    /// Whether any derived style entries are waiting to be written.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Write queued derived styles into the workbook style table. Queued ids
    /// never name an entry that existed when they were composed.
    pub fn commit(self, styles: &mut Map<String, Value>) {
        for (id, entry) in self.pending {
            styles.insert(id, entry);
        }
    }
}
