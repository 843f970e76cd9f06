//! Population-database records.
//!
//! The database is a flat JSON array of person records. Field
//! representations vary across snapshots (`alive` may be a boolean or
//! the strings `"true"`/`"false"`, `age` may be a number or a numeric
//! string), so the flexible deserializers here absorb both forms.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::PersonId;

/// The age below which an award is routed through a custodian.
pub const AGE_OF_MAJORITY: u32 = 18;

/// One person record from the population database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    #[serde(deserialize_with = "de_alive")]
    pub alive: bool,
    #[serde(default, deserialize_with = "de_age")]
    pub age: u32,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub children_ids: Vec<PersonId>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Person {
    /// True when the person is below the age of majority and any award
    /// to them must name a custodian.
    #[must_use]
    pub fn is_minor(&self) -> bool {
        self.age < AGE_OF_MAJORITY
    }
}

/// An asset owned by a person, with its cumulative allocated fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(default)]
    pub allocation: f64,
}

impl Asset {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allocation: 0.0,
        }
    }
}

fn de_alive<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct AliveVisitor;

    impl Visitor<'_> for AliveVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean or the string \"true\"/\"false\"")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(E::custom(format!("invalid alive flag: {other:?}"))),
            }
        }
    }

    deserializer.deserialize_any(AliveVisitor)
}

fn de_age<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct AgeVisitor;

    impl Visitor<'_> for AgeVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("age out of range: {v}")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("age out of range: {v}")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if v.fract() == 0.0 && v >= 0.0 && v <= f64::from(u32::MAX) {
                Ok(v as u32)
            } else {
                Err(E::custom(format!("age out of range: {v}")))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.trim()
                .parse::<u32>()
                .map_err(|_| E::custom(format!("invalid age: {v:?}")))
        }
    }

    deserializer.deserialize_any(AgeVisitor)
}
