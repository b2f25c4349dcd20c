use crate::error::Error;

/// Name of the synthetic layer inserted by the dissector when an upper-layer
/// PDU was reassembled from several transport segments.
///
/// The dissection names this proto `fake-field-wrapper`; it is normalized to
/// `data` when the packet tree is built. Its field set (`tcp.segments`,
/// `tls.segments`, ...) identifies which protocol was reassembled.
pub const DATA_LAYER: &str = "data";

/// One occurrence of a named field inside a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    value: String,
    size: Option<u64>,
}

impl Field {
    pub fn new<S: Into<String>>(value: S) -> Field {
        Field {
            value: value.into(),
            size: None,
        }
    }

    /// Build a field carrying its encoded size, taken from the raw-bytes
    /// entries of the dissection
    pub fn with_size<S: Into<String>>(value: S, size: u64) -> Field {
        Field {
            value: value.into(),
            size: Some(size),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Decode the value as an integer (decimal, or hex with a `0x` prefix as
    /// emitted by the dissector for some fields)
    pub fn as_u64(&self) -> Option<u64> {
        let s = self.value.trim();
        match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        }
    }

    /// Encoded size of the field in bytes, when known
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

/// One protocol layer of a decoded packet.
///
/// Field names are the dissector's full filter names (`tcp.len`,
/// `tls.record.length`, ...) and may repeat within one layer instance.
#[derive(Clone, Debug, Default)]
pub struct Layer {
    name: String,
    fields: Vec<(String, Field)>,
}

impl Layer {
    pub fn new<S: AsRef<str>>(name: S) -> Layer {
        Layer {
            name: name.as_ref().to_ascii_lowercase(),
            fields: Vec::new(),
        }
    }

    /// Protocol name, lowercase
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_field<S: AsRef<str>>(&mut self, name: S, field: Field) {
        self.fields.push((name.as_ref().to_owned(), field));
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// First occurrence of the named field
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// All occurrences of the named field, in dissection order
    pub fn fields<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// Get the named field and decode it as an integer.
    ///
    /// Absence is a [`Error::MissingField`], a non-numeric value a
    /// [`Error::InvalidFieldValue`] — distinguishing a field the protocol
    /// legitimately omits (callers test with [`Layer::has_field`] first) from
    /// a corrupt dissection.
    pub fn u64_field(&self, name: &str) -> Result<u64, Error> {
        let field = self.field(name).ok_or_else(|| Error::MissingField {
            layer: self.name.clone(),
            field: name.to_owned(),
        })?;
        field.as_u64().ok_or_else(|| Error::InvalidFieldValue {
            field: name.to_owned(),
            value: field.as_str().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, Layer};

    #[test]
    fn field_decode() {
        assert_eq!(Field::new("1234").as_u64(), Some(1234));
        assert_eq!(Field::new("0x0303").as_u64(), Some(0x0303));
        assert_eq!(Field::new("example.org").as_u64(), None);
        assert_eq!(Field::with_size("21", 2).size(), Some(2));
    }

    #[test]
    fn repeated_fields() {
        let mut layer = Layer::new("TLS");
        layer.add_field("tls.record.length", Field::new("100"));
        layer.add_field("tls.record.length", Field::new("200"));
        assert_eq!(layer.name(), "tls");
        assert_eq!(layer.field("tls.record.length").unwrap().as_u64(), Some(100));
        let all: Vec<u64> = layer
            .fields("tls.record.length")
            .filter_map(Field::as_u64)
            .collect();
        assert_eq!(all, vec![100, 200]);
        assert_eq!(layer.u64_field("tls.record.length").unwrap(), 100);
        assert!(layer.u64_field("tls.missing").is_err());
    }
}
