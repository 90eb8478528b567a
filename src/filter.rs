// 🔎 Filter Predicate Evaluator
//
// Turns a list request's optional fields into exactly one named query
// variant. Each optional field contributes one bit to a presence mask; the
// mask indexes a fixed table. Combinations with no table entry are rejected
// instead of silently falling back to another query.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, Result};

/// Unix seconds of 0001-01-01T00:00:00Z, the "unset" timestamp clients send
const ZERO_TIMESTAMP_SECS: i64 = -62_135_596_800;

pub fn zero_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ZERO_TIMESTAMP_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn is_zero_timestamp(ts: &DateTime<Utc>) -> bool {
    *ts == zero_timestamp()
}

// ============================================================================
// OPTIONAL FIELDS & PRESENCE MASK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Category,
    Date,
    Description,
    Title,
}

impl FilterField {
    /// Mask bit order: category, date, description, title (high to low)
    pub const fn bit(self) -> u8 {
        match self {
            FilterField::Category => 0b1000,
            FilterField::Date => 0b0100,
            FilterField::Description => 0b0010,
            FilterField::Title => 0b0001,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterField::Category => "category_id",
            FilterField::Date => "date",
            FilterField::Description => "description",
            FilterField::Title => "title",
        }
    }

    const ALL: [FilterField; 4] = [
        FilterField::Category,
        FilterField::Date,
        FilterField::Description,
        FilterField::Title,
    ];
}

/// Validated filter values. Optional fields are `None` unless present.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub owner: i64,
    pub kind: String,
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl FilterCriteria {
    fn new(owner: Option<i64>, kind: Option<&str>) -> Result<Self> {
        let owner = owner
            .filter(|id| *id > 0)
            .ok_or_else(|| LedgerError::InvalidRequest("user_id is required".into()))?;
        // Blank means missing, but a present type binds exactly as stored
        let kind = kind
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LedgerError::InvalidRequest("type is required".into()))?;

        Ok(FilterCriteria {
            owner,
            kind: kind.to_string(),
            category_id: None,
            title: None,
            description: None,
            date: None,
        })
    }

    pub fn is_present(&self, field: FilterField) -> bool {
        match field {
            FilterField::Category => self.category_id.is_some(),
            FilterField::Date => self.date.is_some(),
            FilterField::Description => self.description.is_some(),
            FilterField::Title => self.title.is_some(),
        }
    }

    pub fn presence_mask(&self) -> u8 {
        FilterField::ALL
            .iter()
            .filter(|f| self.is_present(**f))
            .fold(0, |mask, f| mask | f.bit())
    }

    fn present_names(&self) -> String {
        let names: Vec<&str> = FilterField::ALL
            .iter()
            .filter(|f| self.is_present(**f))
            .map(|f| f.name())
            .collect();
        names.join("+")
    }
}

fn present_id(id: Option<i64>) -> Option<i64> {
    id.filter(|v| *v != 0)
}

fn present_text(text: &Option<String>) -> Option<String> {
    text.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn present_date(date: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    date.filter(|d| !is_zero_timestamp(d))
}

// ============================================================================
// VARIANTS
// ============================================================================

/// A named query shape. `fields` lists the optional fields it binds, in
/// parameter order after owner and type.
pub trait QueryVariant: Copy + fmt::Debug + PartialEq + 'static {
    fn fields(self) -> &'static [FilterField];
    fn name(self) -> &'static str;

    fn mask(self) -> u8 {
        self.fields().iter().fold(0, |mask, f| mask | f.bit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountVariant {
    ByOwnerAndType,
    ByOwnerTypeCategory,
    ByOwnerTypeCategoryTitle,
    ByOwnerTypeCategoryTitleDescription,
    ByOwnerTypeDate,
    ByOwnerTypeDescription,
    ByOwnerTypeTitle,
    ByAllFields,
}

impl AccountVariant {
    pub const ALL: [AccountVariant; 8] = [
        AccountVariant::ByOwnerAndType,
        AccountVariant::ByOwnerTypeCategory,
        AccountVariant::ByOwnerTypeCategoryTitle,
        AccountVariant::ByOwnerTypeCategoryTitleDescription,
        AccountVariant::ByOwnerTypeDate,
        AccountVariant::ByOwnerTypeDescription,
        AccountVariant::ByOwnerTypeTitle,
        AccountVariant::ByAllFields,
    ];
}

impl QueryVariant for AccountVariant {
    fn fields(self) -> &'static [FilterField] {
        use FilterField::*;
        match self {
            AccountVariant::ByOwnerAndType => &[],
            AccountVariant::ByOwnerTypeCategory => &[Category],
            AccountVariant::ByOwnerTypeCategoryTitle => &[Category, Title],
            AccountVariant::ByOwnerTypeCategoryTitleDescription => &[Category, Title, Description],
            AccountVariant::ByOwnerTypeDate => &[Date],
            AccountVariant::ByOwnerTypeDescription => &[Description],
            AccountVariant::ByOwnerTypeTitle => &[Title],
            AccountVariant::ByAllFields => &[Category, Title, Description, Date],
        }
    }

    fn name(self) -> &'static str {
        match self {
            AccountVariant::ByOwnerAndType => "ByOwnerAndType",
            AccountVariant::ByOwnerTypeCategory => "ByOwnerTypeCategory",
            AccountVariant::ByOwnerTypeCategoryTitle => "ByOwnerTypeCategoryTitle",
            AccountVariant::ByOwnerTypeCategoryTitleDescription => {
                "ByOwnerTypeCategoryTitleDescription"
            }
            AccountVariant::ByOwnerTypeDate => "ByOwnerTypeDate",
            AccountVariant::ByOwnerTypeDescription => "ByOwnerTypeDescription",
            AccountVariant::ByOwnerTypeTitle => "ByOwnerTypeTitle",
            AccountVariant::ByAllFields => "ByAllFields",
        }
    }
}

/// Indexed by presence mask (category, date, description, title).
/// `None` marks combinations no query exists for.
const ACCOUNT_TABLE: [Option<AccountVariant>; 16] = [
    /* 0000 */ Some(AccountVariant::ByOwnerAndType),
    /* 0001 */ Some(AccountVariant::ByOwnerTypeTitle),
    /* 0010 */ Some(AccountVariant::ByOwnerTypeDescription),
    /* 0011 */ None,
    /* 0100 */ Some(AccountVariant::ByOwnerTypeDate),
    /* 0101 */ None,
    /* 0110 */ None,
    /* 0111 */ None,
    /* 1000 */ Some(AccountVariant::ByOwnerTypeCategory),
    /* 1001 */ Some(AccountVariant::ByOwnerTypeCategoryTitle),
    /* 1010 */ None,
    /* 1011 */ Some(AccountVariant::ByOwnerTypeCategoryTitleDescription),
    /* 1100 */ None,
    /* 1101 */ None,
    /* 1110 */ None,
    /* 1111 */ Some(AccountVariant::ByAllFields),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryVariant {
    ByOwnerAndType,
    ByOwnerTypeDescription,
    ByOwnerTypeTitle,
    ByOwnerTypeTitleDescription,
}

impl CategoryVariant {
    pub const ALL: [CategoryVariant; 4] = [
        CategoryVariant::ByOwnerAndType,
        CategoryVariant::ByOwnerTypeDescription,
        CategoryVariant::ByOwnerTypeTitle,
        CategoryVariant::ByOwnerTypeTitleDescription,
    ];
}

impl QueryVariant for CategoryVariant {
    fn fields(self) -> &'static [FilterField] {
        use FilterField::*;
        match self {
            CategoryVariant::ByOwnerAndType => &[],
            CategoryVariant::ByOwnerTypeDescription => &[Description],
            CategoryVariant::ByOwnerTypeTitle => &[Title],
            CategoryVariant::ByOwnerTypeTitleDescription => &[Title, Description],
        }
    }

    fn name(self) -> &'static str {
        match self {
            CategoryVariant::ByOwnerAndType => "ByOwnerAndType",
            CategoryVariant::ByOwnerTypeDescription => "ByOwnerTypeDescription",
            CategoryVariant::ByOwnerTypeTitle => "ByOwnerTypeTitle",
            CategoryVariant::ByOwnerTypeTitleDescription => "ByOwnerTypeTitleDescription",
        }
    }
}

/// Indexed by presence mask (description, title); categories cover every
/// combination.
const CATEGORY_TABLE: [CategoryVariant; 4] = [
    /* 00 */ CategoryVariant::ByOwnerAndType,
    /* 01 */ CategoryVariant::ByOwnerTypeTitle,
    /* 10 */ CategoryVariant::ByOwnerTypeDescription,
    /* 11 */ CategoryVariant::ByOwnerTypeTitleDescription,
];

/// Outcome of evaluation: the variant and the values it will bind
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<V: QueryVariant> {
    pub variant: V,
    pub criteria: FilterCriteria,
}

// ============================================================================
// REQUEST FILTERS
// ============================================================================

/// Accepts either the typed value or its text form. Form-encoded clients send
/// every field as text, and an empty one means "not set".
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOr<T> {
    Text(String),
    Typed(T),
}

fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    match Option::<TextOr<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(TextOr::Typed(value)) => Ok(Some(value)),
        Some(TextOr::Text(raw)) if raw.trim().is_empty() => Ok(None),
        Some(TextOr::Text(raw)) => raw.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

/// Raw account list request. Every field is optional at this level so that
/// missing mandatory fields surface as `InvalidRequest`, not a bind failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_id: Option<i64>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date: Option<DateTime<Utc>>,
}

impl AccountFilter {
    pub fn evaluate(&self) -> Result<Selection<AccountVariant>> {
        let mut criteria = FilterCriteria::new(self.user_id, self.account_type.as_deref())?;
        criteria.category_id = present_id(self.category_id);
        criteria.title = present_text(&self.title);
        criteria.description = present_text(&self.description);
        criteria.date = present_date(self.date);

        match ACCOUNT_TABLE[criteria.presence_mask() as usize] {
            Some(variant) => Ok(Selection { variant, criteria }),
            None => Err(LedgerError::InvalidRequest(format!(
                "unsupported filter combination: {}",
                criteria.present_names()
            ))),
        }
    }
}

/// Raw category list request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_id: Option<i64>,
    #[serde(rename = "type")]
    pub category_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl CategoryFilter {
    pub fn evaluate(&self) -> Result<Selection<CategoryVariant>> {
        let mut criteria = FilterCriteria::new(self.user_id, self.category_type.as_deref())?;
        criteria.title = present_text(&self.title);
        criteria.description = present_text(&self.description);

        let variant = CATEGORY_TABLE[criteria.presence_mask() as usize];
        Ok(Selection { variant, criteria })
    }
}
