use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::matching::parse_price;
use crate::normalize::normalize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    #[serde(deserialize_with = "lenient_string")]
    pub street: String,
    #[serde(deserialize_with = "lenient_string")]
    pub town: String,
    #[serde(deserialize_with = "lenient_string")]
    pub postcode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub price: String,
}

impl Query {
    pub fn new(street: &str, town: &str, postcode: &str, price: &str) -> Self {
        Self {
            street: street.to_string(),
            town: town.to_string(),
            postcode: postcode.to_string(),
            price: price.to_string(),
        }
    }

    pub fn cache_key(&self) -> String {
        let canonical = Query {
            street: normalize(&self.street),
            town: normalize(&self.town),
            postcode: normalize(&self.postcode),
            price: normalize(&self.price),
        };
        serde_json::to_string(&canonical).unwrap_or_default()
    }

    pub fn wanted_price(&self) -> Option<u64> {
        parse_price(&self.price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Sales,
    Lettings,
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sales => "sales",
            Self::Lettings => "lettings",
        })
    }
}

/// Upstream record as returned by the catalog API. Both markets share the field names we
/// read; anything else in the payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawListing {
    pub ref_id: Option<Value>,
    pub sales_lifecycle_id: Option<Value>,
    pub lettings_lifecycle_id: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub property_street: String,
    #[serde(deserialize_with = "lenient_string")]
    pub property_locality: String,
    #[serde(deserialize_with = "lenient_string")]
    pub property_town: String,
    #[serde(deserialize_with = "lenient_string")]
    pub property_postcode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub property_type_text: String,
    pub price: Option<Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub team_email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub team_phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub responsible_agent_name: String,
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn price_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u64))
            .filter(|p| *p > 0),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(rename = "refId")]
    pub ref_id: String,
    pub address: String,
    pub street: String,
    pub town: String,
    pub postcode: String,
    #[serde(rename = "propertyTypeText")]
    pub property_type: String,
    pub price: Option<u64>,
    pub market: Market,
    #[serde(rename = "teamEmail")]
    pub contact_email: String,
    #[serde(rename = "teamPhone")]
    pub contact_phone: String,
    #[serde(rename = "responsibleAgentName")]
    pub agent_name: String,
}

impl Candidate {
    pub fn from_raw(raw: &RawListing, market: Market) -> Self {
        let ref_id = [&raw.ref_id, &raw.sales_lifecycle_id, &raw.lettings_lifecycle_id]
            .into_iter()
            .flatten()
            .find(|v| !v.is_null())
            .map(value_text)
            .unwrap_or_default();

        let address = if raw.address.trim().is_empty() {
            [
                &raw.property_street,
                &raw.property_locality,
                &raw.property_town,
                &raw.property_postcode,
            ]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
        } else {
            raw.address.trim().to_string()
        };

        Self {
            ref_id,
            address,
            street: raw.property_street.trim().to_string(),
            town: raw.property_town.trim().to_string(),
            postcode: raw.property_postcode.trim().to_string(),
            property_type: raw.property_type_text.trim().to_string(),
            price: raw.price.as_ref().and_then(price_of),
            market,
            contact_email: raw.team_email.trim().to_string(),
            contact_phone: raw.team_phone.trim().to_string(),
            agent_name: raw.responsible_agent_name.trim().to_string(),
        }
    }

    /// Deduplication key: the reference id when present, else the formatted address.
    pub fn identity_key(&self) -> &str {
        if self.ref_id.is_empty() {
            &self.address
        } else {
            &self.ref_id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub candidates: Vec<Candidate>,
    pub markets_present: Vec<Market>,
    pub sales_count: usize,
    pub lettings_count: usize,
    pub transient: bool,
}

impl LookupResult {
    pub fn pack(candidates: Vec<Candidate>, transient: bool) -> Self {
        let sales_count = candidates.iter().filter(|c| c.market == Market::Sales).count();
        let lettings_count = candidates.len() - sales_count;

        let mut markets_present = Vec::new();
        for candidate in &candidates {
            if !markets_present.contains(&candidate.market) {
                markets_present.push(candidate.market);
            }
        }

        Self {
            candidates,
            markets_present,
            sales_count,
            lettings_count,
            transient,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
