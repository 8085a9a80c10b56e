use serde::{Deserialize, Serialize};

/// One I-94 arrival record as exported from the SAS extract.
///
/// Numeric SAS fields are integral in practice and kept as `i64`, which keeps
/// the whole record `Eq + Hash` for full-row deduplication. `arrdate` and
/// `depdate` are day offsets from the SAS epoch (1960-01-01).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImmigrationRecord {
    pub cicid: i64,
    pub i94yr: Option<i64>,
    pub i94mon: Option<i64>,
    pub i94cit: Option<i64>,
    pub i94res: Option<i64>,
    pub i94port: Option<String>,
    pub arrdate: Option<i64>,
    pub i94mode: Option<i64>,
    pub i94addr: Option<String>,
    pub depdate: Option<i64>,
    pub i94bir: Option<i64>,
    pub i94visa: Option<i64>,
    pub matflag: Option<String>,
    pub gender: Option<String>,
    pub airline: Option<String>,
    pub visatype: Option<String>,
}

impl ImmigrationRecord {
    pub fn new(cicid: i64) -> Self {
        Self {
            cicid,
            i94yr: None,
            i94mon: None,
            i94cit: None,
            i94res: None,
            i94port: None,
            arrdate: None,
            i94mode: None,
            i94addr: None,
            depdate: None,
            i94bir: None,
            i94visa: None,
            matflag: None,
            gender: None,
            airline: None,
            visatype: None,
        }
    }

    pub fn with_port(mut self, port: &str) -> Self {
        self.i94port = Some(port.to_string());
        self
    }

    pub fn with_dates(mut self, arrdate: Option<i64>, depdate: Option<i64>) -> Self {
        self.arrdate = arrdate;
        self.depdate = depdate;
        self
    }

    pub fn with_match_flag(mut self, flag: &str) -> Self {
        self.matflag = Some(flag.to_string());
        self
    }

    pub fn has_departure(&self) -> bool {
        self.depdate.is_some()
    }

    pub fn is_matched(&self) -> bool {
        self.matflag.is_some()
    }
}
