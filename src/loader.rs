//! Turns the survey CSV export into typed respondent records.
//!
//! Columns are located by header name, so reordering between dataset
//! versions is harmless. Rows with unusable coordinates are skipped and
//! rows with an unreadable survey blob keep an empty survey.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::district::classify_district;
use crate::parser::{ParseMode, parse_line};
use crate::survey::{RawAnswers, SurveyRecord, leading_float, leading_int};

pub const LONGITUDE_COLUMN: &str = "WGSX";
pub const LATITUDE_COLUMN: &str = "WGSY";
pub const SURVEY_COLUMN: &str = "data";
pub const BIRTH_YEAR_COLUMN: &str = "出生年月（年月日）";
pub const AGE_COLUMN: &str = "年龄（实岁）";
pub const GENDER_COLUMN: &str = "性别00";
pub const RESIDENCE_TYPE_COLUMN: &str = "居住情况";
pub const SURVEY_DAY_COLUMN: &str = "调查星期";
pub const EMPLOYMENT_COLUMN: &str = "就业/学状态";
pub const OCCUPATION_COLUMN: &str = "职业（身份）";
pub const WORK_ADDRESS_COLUMN: &str = "单位（学校）地址";
pub const COMPLETE_ADDRESS_COLUMN: &str = "完整地址";
pub const ADDRESS_ID_COLUMN: &str = "地址ID";
pub const WORK_DISTRICT_COLUMN: &str = "单位（学校）地址-行政区县";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LoadError {
    #[error("survey document is empty")]
    EmptyDocument,
    #[error("required column `{column}` not found in header: {header:?}")]
    MissingColumn { column: String, header: Vec<String> },
}

/// Parsed header row with by-name lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of the first column with exactly this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of column `name` in `fields`, if both the column and the cell exist.
    pub fn lookup<'a>(&self, fields: &'a [String], name: &str) -> Option<&'a str> {
        self.index_of(name)
            .and_then(|i| fields.get(i))
            .map(String::as_str)
    }

    /// Like [`Header::lookup`], but a missing column or cell reads as "".
    pub fn value<'a>(&self, fields: &'a [String], name: &str) -> &'a str {
        self.lookup(fields, name).unwrap_or("")
    }

    fn require(&self, name: &str) -> Result<usize, LoadError> {
        self.index_of(name).ok_or_else(|| LoadError::MissingColumn {
            column: name.to_string(),
            header: self.columns.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Accepts only finite coordinates with |lat| < 90 and |lng| < 180.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        (lat.abs() < 90.0 && lng.abs() < 180.0).then_some(Self { lat, lng })
    }

    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Gender {
    #[default]
    #[serde(rename = "男")]
    Male,
    #[serde(rename = "女")]
    Female,
}

impl Gender {
    /// The sex column codes female as "1"; every other value reads as male.
    pub fn from_code(code: &str) -> Self {
        if code == "1" {
            Gender::Female
        } else {
            Gender::Male
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub birth_year: String,
    pub age: u32,
    pub gender: Gender,
    pub residence_type: String,
    pub survey_day: String,
    pub employment_status: String,
    pub occupation: String,
    pub work_address: String,
    pub complete_address: String,
    pub address_id: String,
    /// A gazetteer district or "".
    pub work_district: String,
    /// A gazetteer district or "".
    pub residence_district: String,
}

impl Profile {
    fn from_fields(header: &Header, fields: &[String]) -> Self {
        let complete_address = header.value(fields, COMPLETE_ADDRESS_COLUMN).to_string();
        let work_address = match header.lookup(fields, WORK_ADDRESS_COLUMN) {
            Some(address) => address.to_string(),
            None if header.index_of(WORK_ADDRESS_COLUMN).is_none() => complete_address.clone(),
            None => String::new(),
        };

        // the bureau column wins when it names a known district
        let work_district = match classify_district(header.value(fields, WORK_DISTRICT_COLUMN)) {
            "" => classify_district(&work_address),
            district => district,
        };
        let residence_district = classify_district(&complete_address);

        let age = leading_int(header.value(fields, AGE_COLUMN))
            .and_then(|a| u32::try_from(a).ok())
            .unwrap_or(0);

        Profile {
            birth_year: header.value(fields, BIRTH_YEAR_COLUMN).to_string(),
            age,
            gender: Gender::from_code(header.value(fields, GENDER_COLUMN)),
            residence_type: header.value(fields, RESIDENCE_TYPE_COLUMN).to_string(),
            survey_day: header.value(fields, SURVEY_DAY_COLUMN).to_string(),
            employment_status: header.value(fields, EMPLOYMENT_COLUMN).to_string(),
            occupation: header.value(fields, OCCUPATION_COLUMN).to_string(),
            work_address,
            complete_address,
            address_id: header.value(fields, ADDRESS_ID_COLUMN).to_string(),
            work_district: work_district.to_string(),
            residence_district: residence_district.to_string(),
        }
    }
}

/// One survey participant. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondentRecord {
    pub location: Location,
    pub raw_fields: Vec<String>,
    pub profile: Profile,
    pub survey: SurveyRecord,
}

impl RespondentRecord {
    /// Raw cell by column name, for fields the profile does not model.
    pub fn raw_field<'a>(&'a self, header: &Header, name: &str) -> Option<&'a str> {
        header.lookup(&self.raw_fields, name)
    }
}

/// Result of one load: the records plus counts of what was skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub header: Header,
    pub respondents: Vec<RespondentRecord>,
    /// Rows dropped for missing or out-of-range coordinates.
    pub dropped_rows: usize,
    /// Rows kept with an empty survey because the blob did not parse.
    pub degraded_surveys: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.respondents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }
}

/// Loads every respondent with valid coordinates from a CSV document.
///
/// # Errors
///
/// Fails only when the document is empty or the header lacks `WGSX` or
/// `WGSY`. Malformed rows never fail the load.
pub fn load_respondents(text: &str, mode: ParseMode) -> Result<Dataset, LoadError> {
    let mut lines = text.trim().split('\n');

    let header_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(LoadError::EmptyDocument),
    };
    let header_line = header_line.strip_prefix('\u{feff}').unwrap_or(header_line);
    let header = Header::new(parse_line(header_line, mode));

    let (lng_index, lat_index) = match (
        header.require(LONGITUDE_COLUMN),
        header.require(LATITUDE_COLUMN),
    ) {
        (Ok(lng), Ok(lat)) => (lng, lat),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Cannot locate coordinate columns");
            return Err(e);
        }
    };

    let mut dataset = Dataset {
        header,
        ..Default::default()
    };

    for (offset, line) in lines.enumerate() {
        let line_number = offset + 2;
        let fields = parse_line(line, mode);

        let Some(location) = parse_location(&fields, lat_index, lng_index) else {
            debug!(line = line_number, "Dropping row with invalid coordinates");
            dataset.dropped_rows += 1;
            continue;
        };

        let raw = match dataset.header.lookup(&fields, SURVEY_COLUMN) {
            Some(blob) if !blob.is_empty() => match RawAnswers::parse_blob(blob) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(line = line_number, error = %e, "Failed to parse survey data");
                    dataset.degraded_surveys += 1;
                    RawAnswers::default()
                }
            },
            _ => RawAnswers::default(),
        };

        let profile = Profile::from_fields(&dataset.header, &fields);
        dataset.respondents.push(RespondentRecord {
            location,
            profile,
            survey: SurveyRecord::decode(&raw),
            raw_fields: fields,
        });
    }

    info!(
        kept = dataset.respondents.len(),
        dropped = dataset.dropped_rows,
        degraded = dataset.degraded_surveys,
        "Survey CSV loaded"
    );

    Ok(dataset)
}

fn parse_location(fields: &[String], lat_index: usize, lng_index: usize) -> Option<Location> {
    // text after the number is ignored: "31.2abc" reads as 31.2
    let lat = leading_float(fields.get(lat_index)?)?;
    let lng = leading_float(fields.get(lng_index)?)?;
    Location::new(lat, lng)
}
