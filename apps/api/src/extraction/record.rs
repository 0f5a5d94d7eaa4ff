use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::plans::PayerPlan;

/// One field of an extracted record. `None` is the absence marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub field: &'static str,
    pub value: Option<String>,
}

/// The normalized result for one document: exactly the plan's fields, in the plan's order.
///
/// Only `normalize_response` builds records from provider output, so the key set can
/// never drift from the plan's field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    plan: PayerPlan,
    values: Vec<FieldValue>,
}

impl ExtractedRecord {
    /// Builds a record for `plan`, asking `lookup` for each field in order.
    pub(crate) fn from_lookup<F>(plan: PayerPlan, mut lookup: F) -> Self
    where
        F: FnMut(&'static str) -> Option<String>,
    {
        let values = plan
            .fields()
            .iter()
            .map(|&field| FieldValue {
                field,
                value: lookup(field),
            })
            .collect();
        Self { plan, values }
    }

    pub fn plan(&self) -> PayerPlan {
        self.plan
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldValue> {
        self.values.iter()
    }

    /// The value for `field`, or `None` when absent or not a field of this plan.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.field == field)
            .and_then(|v| v.value.as_deref())
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.value.is_some()).count()
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }
}

// Serialized as a plain JSON object in field order, `null` for absent values.
impl Serialize for ExtractedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for v in &self.values {
            map.serialize_entry(v.field, &v.value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup_follows_plan_order() {
        let record = ExtractedRecord::from_lookup(PayerPlan::Mch, |_| None);
        let names: Vec<_> = record.fields().map(|v| v.field).collect();
        assert_eq!(names, PayerPlan::Mch.fields());
        assert_eq!(record.present_count(), 0);
    }

    #[test]
    fn test_serializes_in_field_order_with_nulls() {
        let record = ExtractedRecord::from_lookup(PayerPlan::Mch, |f| {
            (f == "Policy No").then(|| "P-77".to_string())
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.starts_with(r#"{"Insured Name":null,"Policy No":"P-77","#));
        assert!(json.ends_with(r#""Issuing Office":null}"#));
    }

    #[test]
    fn test_get_unknown_field_is_none() {
        let record = ExtractedRecord::from_lookup(PayerPlan::Qlm, |_| Some("x".into()));
        assert_eq!(record.get("Patient Name"), Some("x"));
        assert_eq!(record.get("Nope"), None);
    }
}
