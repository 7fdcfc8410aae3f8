//! Ordered, case-insensitive header multimap.

/// A single header field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: String,
}

impl HeaderField {
    /// The field name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Header section of a message or body part.
///
/// Field order is preserved. Name lookups ignore ASCII case. CR and LF in
/// values are replaced with spaces so that a value can never start a new
/// header line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

fn sanitize(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

impl Headers {
    /// Create an empty header section.
    pub fn new() -> Self {
        Self::default()
    }

    /// All values of `name`, in order.
    pub fn get(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
            .collect()
    }

    /// The first value of `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// Whether at least one `name` field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Replace every `name` field with a single one.
    ///
    /// The new field takes the position of the first existing one, or is
    /// appended when there was none.
    pub fn set(&mut self, name: &str, value: &str) {
        let value = sanitize(value);
        match self
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
        {
            Some(pos) => {
                self.fields[pos].value = value;
                let mut index = 0;
                self.fields.retain(|f| {
                    let keep = index <= pos || !f.name.eq_ignore_ascii_case(name);
                    index += 1;
                    keep
                });
            }
            None => self.fields.push(HeaderField {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Append a field.
    pub fn add(&mut self, name: &str, value: &str) {
        self.fields.push(HeaderField {
            name: name.to_string(),
            value: sanitize(value),
        });
    }

    /// Remove every `name` field. Returns the removed values.
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.fields.retain(|f| {
            if f.name.eq_ignore_ascii_case(name) {
                removed.push(f.value.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Replace all `name` fields with `values`, keeping the position of the
    /// first existing field.
    pub fn replace_all(&mut self, name: &str, values: &[String]) {
        let pos = self
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .unwrap_or(self.fields.len());
        let canonical_name = self
            .fields
            .get(pos)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| name.to_string());

        let before = self.fields[..pos]
            .iter()
            .filter(|f| !f.name.eq_ignore_ascii_case(name))
            .count();
        self.fields.retain(|f| !f.name.eq_ignore_ascii_case(name));

        let new_fields = values.iter().map(|v| HeaderField {
            name: canonical_name.clone(),
            value: sanitize(v),
        });
        self.fields.splice(before..before, new_fields);
    }

    /// Keep only the fields for which `keep` returns true.
    pub fn retain<F: FnMut(&HeaderField) -> bool>(&mut self, keep: F) {
        self.fields.retain(keep);
    }

    /// Iterate over all fields in order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn push_raw(&mut self, name: String, value: String) {
        self.fields.push(HeaderField { name, value });
    }
}
