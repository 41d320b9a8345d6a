//! OpenFDA request types
//!
//! Endpoints are a closed set; a [`FetchRequest`] pairs one with its query
//! parameters and paging window.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::openfda as api;

/// Query parameters as sent to the API (excluding paging and the API key)
pub type QueryParams = HashMap<String, String>;

/// FDA regulatory domain an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Drug,
    Food,
    Device,
    Tobacco,
    #[serde(rename = "animalandveterinary")]
    AnimalVeterinary,
    Other,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Drug => write!(f, "drug"),
            Domain::Food => write!(f, "food"),
            Domain::Device => write!(f, "device"),
            Domain::Tobacco => write!(f, "tobacco"),
            Domain::AnimalVeterinary => write!(f, "animal and veterinary"),
            Domain::Other => write!(f, "other"),
        }
    }
}

/// OpenFDA dataset endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    #[serde(rename = "drug/event")]
    DrugEvent,
    #[serde(rename = "drug/label")]
    DrugLabel,
    #[serde(rename = "drug/enforcement")]
    DrugEnforcement,
    #[serde(rename = "drug/ndc")]
    DrugNdc,
    #[serde(rename = "drug/drugsfda")]
    DrugsFda,
    #[serde(rename = "food/event")]
    FoodEvent,
    #[serde(rename = "food/enforcement")]
    FoodEnforcement,
    #[serde(rename = "device/event")]
    DeviceEvent,
    #[serde(rename = "device/510k")]
    Device510k,
    #[serde(rename = "device/classification")]
    DeviceClassification,
    #[serde(rename = "device/enforcement")]
    DeviceEnforcement,
    #[serde(rename = "device/recall")]
    DeviceRecall,
    #[serde(rename = "device/pma")]
    DevicePma,
    #[serde(rename = "device/udi")]
    DeviceUdi,
    #[serde(rename = "tobacco/problem")]
    TobaccoProblem,
    #[serde(rename = "tobacco/researchedproducts")]
    TobaccoResearchedProducts,
    #[serde(rename = "animalandveterinary/event")]
    AnimalVeterinaryEvent,
    #[serde(rename = "other/substance")]
    OtherSubstance,
    #[serde(rename = "other/nsde")]
    OtherNsde,
}

impl Endpoint {
    pub const ALL: [Endpoint; 19] = [
        Endpoint::DrugEvent,
        Endpoint::DrugLabel,
        Endpoint::DrugEnforcement,
        Endpoint::DrugNdc,
        Endpoint::DrugsFda,
        Endpoint::FoodEvent,
        Endpoint::FoodEnforcement,
        Endpoint::DeviceEvent,
        Endpoint::Device510k,
        Endpoint::DeviceClassification,
        Endpoint::DeviceEnforcement,
        Endpoint::DeviceRecall,
        Endpoint::DevicePma,
        Endpoint::DeviceUdi,
        Endpoint::TobaccoProblem,
        Endpoint::TobaccoResearchedProducts,
        Endpoint::AnimalVeterinaryEvent,
        Endpoint::OtherSubstance,
        Endpoint::OtherNsde,
    ];

    /// Dataset identifier, e.g. `drug/event`
    pub fn id(&self) -> &'static str {
        match self {
            Endpoint::DrugEvent => "drug/event",
            Endpoint::DrugLabel => "drug/label",
            Endpoint::DrugEnforcement => "drug/enforcement",
            Endpoint::DrugNdc => "drug/ndc",
            Endpoint::DrugsFda => "drug/drugsfda",
            Endpoint::FoodEvent => "food/event",
            Endpoint::FoodEnforcement => "food/enforcement",
            Endpoint::DeviceEvent => "device/event",
            Endpoint::Device510k => "device/510k",
            Endpoint::DeviceClassification => "device/classification",
            Endpoint::DeviceEnforcement => "device/enforcement",
            Endpoint::DeviceRecall => "device/recall",
            Endpoint::DevicePma => "device/pma",
            Endpoint::DeviceUdi => "device/udi",
            Endpoint::TobaccoProblem => "tobacco/problem",
            Endpoint::TobaccoResearchedProducts => "tobacco/researchedproducts",
            Endpoint::AnimalVeterinaryEvent => "animalandveterinary/event",
            Endpoint::OtherSubstance => "other/substance",
            Endpoint::OtherNsde => "other/nsde",
        }
    }

    /// URL path relative to the API root, e.g. `drug/event.json`
    pub fn path(&self) -> String {
        format!("{}.json", self.id())
    }

    pub fn domain(&self) -> Domain {
        match self {
            Endpoint::DrugEvent
            | Endpoint::DrugLabel
            | Endpoint::DrugEnforcement
            | Endpoint::DrugNdc
            | Endpoint::DrugsFda => Domain::Drug,
            Endpoint::FoodEvent | Endpoint::FoodEnforcement => Domain::Food,
            Endpoint::DeviceEvent
            | Endpoint::Device510k
            | Endpoint::DeviceClassification
            | Endpoint::DeviceEnforcement
            | Endpoint::DeviceRecall
            | Endpoint::DevicePma
            | Endpoint::DeviceUdi => Domain::Device,
            Endpoint::TobaccoProblem | Endpoint::TobaccoResearchedProducts => Domain::Tobacco,
            Endpoint::AnimalVeterinaryEvent => Domain::AnimalVeterinary,
            Endpoint::OtherSubstance | Endpoint::OtherNsde => Domain::Other,
        }
    }

    /// Field that dates a record, used for date-range filters
    pub fn date_field(&self) -> Option<&'static str> {
        match self {
            Endpoint::DrugEvent => Some("receivedate"),
            Endpoint::DrugLabel => Some("effective_time"),
            Endpoint::DrugEnforcement
            | Endpoint::FoodEnforcement
            | Endpoint::DeviceEnforcement => Some("recall_initiation_date"),
            Endpoint::DrugNdc | Endpoint::OtherNsde => Some("marketing_start_date"),
            Endpoint::FoodEvent => Some("date_created"),
            Endpoint::DeviceEvent => Some("date_received"),
            Endpoint::Device510k | Endpoint::DevicePma => Some("decision_date"),
            Endpoint::DeviceRecall => Some("event_date_initiated"),
            Endpoint::DeviceUdi => Some("publish_date"),
            Endpoint::TobaccoProblem => Some("date_submitted"),
            Endpoint::AnimalVeterinaryEvent => Some("original_receive_date"),
            Endpoint::DrugsFda
            | Endpoint::DeviceClassification
            | Endpoint::TobaccoResearchedProducts
            | Endpoint::OtherSubstance => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_matches('/').to_lowercase();
        let id = normalized.strip_suffix(".json").unwrap_or(&normalized);
        Endpoint::ALL
            .iter()
            .copied()
            .find(|e| e.id() == id)
            .ok_or_else(|| {
                format!(
                    "Unknown endpoint '{}'. Valid values: {}",
                    s,
                    Endpoint::ALL
                        .iter()
                        .map(|e| e.id())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// One page request against an OpenFDA endpoint
///
/// Built once and then shared by reference; the fetch layer never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub endpoint: Endpoint,
    pub params: QueryParams,
    /// Records per page (`limit`)
    pub page_size: u32,
    /// Records to skip (`skip`)
    pub offset: u32,
}

impl FetchRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: QueryParams::new(),
            page_size: api::DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }

    /// Set the `search` expression
    ///
    /// OpenFDA documents searches in URL form, with `+` standing for a space;
    /// those are normalized so the value is encoded exactly once.
    pub fn search(self, expression: impl AsRef<str>) -> Self {
        let expression = expression.as_ref().replace('+', " ");
        self.param("search", expression)
    }

    /// Restrict to records whose `field` falls between `start` and `end`
    ///
    /// ANDed onto any existing search expression.
    pub fn between(self, field: &str, start: NaiveDate, end: NaiveDate) -> Self {
        let term = format!("{}:{}", field, date_range(start, end));
        let expression = match self.params.get("search") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} AND {}", existing, term)
            }
            _ => term,
        };
        self.param("search", expression)
    }

    /// Turn this into a `count` aggregation over `field`
    pub fn count(self, field: impl Into<String>) -> Self {
        self.param("count", field)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn page(mut self, page_size: u32, offset: u32) -> Self {
        self.page_size = page_size;
        self.offset = offset;
        self
    }

    pub fn is_count(&self) -> bool {
        self.params.contains_key("count")
    }

    /// Same request moved to another paging window
    pub fn with_page(&self, page_size: u32, offset: u32) -> Self {
        self.clone().page(page_size, offset)
    }

    /// Check paging bounds against the API limits
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > api::MAX_PAGE_SIZE {
            return Err(format!(
                "page size must be between 1 and {}, got {}",
                api::MAX_PAGE_SIZE,
                self.page_size
            ));
        }
        if self.offset > api::MAX_SKIP {
            return Err(format!(
                "offset must not exceed {}, got {}",
                api::MAX_SKIP,
                self.offset
            ));
        }
        Ok(())
    }

    /// Every query parameter the request sends, paging included
    ///
    /// `skip` is omitted at offset zero; count queries do not page.
    pub fn query_params(&self) -> QueryParams {
        let mut params = self.params.clone();
        params.insert("limit".to_string(), self.page_size.to_string());
        if self.offset > 0 {
            params.insert("skip".to_string(), self.offset.to_string());
        }
        params
    }

    /// Short description for logs; never includes credentials
    pub fn describe(&self) -> String {
        let mut keys: Vec<_> = self.params.iter().collect();
        keys.sort();
        let query = keys
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!(
            "{}?{} [limit={}, skip={}]",
            self.endpoint, query, self.page_size, self.offset
        )
    }
}

/// Format an OpenFDA date-range term: `[YYYYMMDD TO YYYYMMDD]`
pub fn date_range(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "[{} TO {}]",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::DrugEvent.path(), "drug/event.json");
        assert_eq!(
            Endpoint::AnimalVeterinaryEvent.path(),
            "animalandveterinary/event.json"
        );
        assert_eq!(Endpoint::TobaccoProblem.domain(), Domain::Tobacco);
    }

    #[test]
    fn test_endpoint_from_str() {
        assert_eq!(
            "drug/event".parse::<Endpoint>().unwrap(),
            Endpoint::DrugEvent
        );
        assert_eq!(
            "/device/510k.json".parse::<Endpoint>().unwrap(),
            Endpoint::Device510k
        );
        assert!("drug/unknown".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_endpoint_ids_unique() {
        let mut ids: Vec<_> = Endpoint::ALL.iter().map(|e| e.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Endpoint::ALL.len());
    }

    #[test]
    fn test_search_normalizes_plus() {
        let request =
            FetchRequest::new(Endpoint::DrugEvent).search("receivedate:[20200101+TO+20201231]");
        assert_eq!(
            request.params.get("search").unwrap(),
            "receivedate:[20200101 TO 20201231]"
        );
    }

    #[test]
    fn test_query_params_include_paging() {
        let request = FetchRequest::new(Endpoint::FoodEnforcement)
            .count("report_date")
            .page(50, 0);
        let params = request.query_params();
        assert_eq!(params.get("limit").unwrap(), "50");
        assert!(!params.contains_key("skip"));
        assert!(request.is_count());

        let params = request.with_page(50, 100).query_params();
        assert_eq!(params.get("skip").unwrap(), "100");
    }

    #[test]
    fn test_validate_bounds() {
        let request = FetchRequest::new(Endpoint::DrugLabel);
        assert!(request.validate().is_ok());
        assert!(request.with_page(0, 0).validate().is_err());
        assert!(request.with_page(1001, 0).validate().is_err());
        assert!(request.with_page(1000, 25_000).validate().is_ok());
        assert!(request.with_page(100, 25_001).validate().is_err());
    }

    #[test]
    fn test_date_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(date_range(start, end), "[20240105 TO 20241231]");
    }

    #[test]
    fn test_between_builds_date_filter() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();

        let request = FetchRequest::new(Endpoint::FoodEnforcement).between(
            "recall_initiation_date",
            start,
            end,
        );
        assert_eq!(
            request.params["search"],
            "recall_initiation_date:[20230101 TO 20230630]"
        );

        let request = FetchRequest::new(Endpoint::TobaccoProblem)
            .search("tobacco_products:Cigarette")
            .between("date_submitted", start, end);
        assert_eq!(
            request.params["search"],
            "tobacco_products:Cigarette AND date_submitted:[20230101 TO 20230630]"
        );
    }

    #[test]
    fn test_date_fields() {
        assert_eq!(Endpoint::DrugEvent.date_field(), Some("receivedate"));
        assert_eq!(Endpoint::DeviceEvent.date_field(), Some("date_received"));
        assert_eq!(Endpoint::OtherSubstance.date_field(), None);
    }

    #[test]
    fn test_describe_is_sorted() {
        let request = FetchRequest::new(Endpoint::DrugEvent)
            .param("search", "x")
            .param("count", "y");
        assert_eq!(
            request.describe(),
            "drug/event?count=y&search=x [limit=100, skip=0]"
        );
    }
}
