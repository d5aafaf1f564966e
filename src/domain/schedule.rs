use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Year key as it appears in config files: `2035` or `"2035"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(untagged)]
enum RawYear {
    Int(i32),
    Text(String),
}

/// Values indexed by calendar year (prices, utilization, O&M rates).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<RawYear, f64>", into = "BTreeMap<String, f64>")]
pub struct YearSchedule(BTreeMap<i32, f64>);

impl YearSchedule {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// The same value for `years` consecutive years starting at `start`.
    pub fn flat(start: i32, years: u32, value: f64) -> Self {
        (0..years as i32).map(|i| (start + i, value)).collect()
    }

    pub fn insert(&mut self, year: i32, value: f64) -> Option<f64> {
        self.0.insert(year, value)
    }

    /// Exact lookup.
    pub fn get(&self, year: i32) -> Option<f64> {
        self.0.get(&year).copied()
    }

    /// Value in effect for `year`: the exact entry, else the latest earlier
    /// entry, else the earliest entry. `None` only when empty.
    pub fn value_for(&self, year: i32) -> Option<f64> {
        self.0
            .range(..=year)
            .next_back()
            .or_else(|| self.0.iter().next())
            .map(|(_, v)| *v)
    }

    pub fn first_year(&self) -> Option<i32> {
        self.0.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.0.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.0.iter().map(|(y, v)| (*y, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    /// Every value is finite.
    pub fn is_finite(&self) -> bool {
        self.0.values().all(|v| v.is_finite())
    }
}

impl FromIterator<(i32, f64)> for YearSchedule {
    fn from_iter<I: IntoIterator<Item = (i32, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<BTreeMap<RawYear, f64>> for YearSchedule {
    type Error = String;

    fn try_from(raw: BTreeMap<RawYear, f64>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(key, value)| {
                let year = match key {
                    RawYear::Int(y) => y,
                    RawYear::Text(s) => s
                        .trim()
                        .parse::<i32>()
                        .map_err(|_| format!("invalid year key `{}`", s))?,
                };
                Ok((year, value))
            })
            .collect()
    }
}

impl From<YearSchedule> for BTreeMap<String, f64> {
    fn from(schedule: YearSchedule) -> Self {
        schedule
            .0
            .into_iter()
            .map(|(y, v)| (y.to_string(), v))
            .collect()
    }
}

impl fmt::Display for YearSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first_year(), self.last_year()) {
            (Some(first), Some(last)) => write!(f, "{}..={} ({} values)", first, last, self.len()),
            _ => write!(f, "empty"),
        }
    }
}

/// A unit cost or rate that is either constant or indexed by year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearlyValue {
    Flat(f64),
    Schedule(YearSchedule),
}

impl YearlyValue {
    pub fn value_for(&self, year: i32) -> Option<f64> {
        match self {
            YearlyValue::Flat(v) => Some(*v),
            YearlyValue::Schedule(s) => s.value_for(year),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            YearlyValue::Flat(v) => v.is_finite(),
            YearlyValue::Schedule(s) => !s.is_empty() && s.is_finite(),
        }
    }
}

impl Default for YearlyValue {
    fn default() -> Self {
        YearlyValue::Flat(0.0)
    }
}

impl From<f64> for YearlyValue {
    fn from(v: f64) -> Self {
        YearlyValue::Flat(v)
    }
}

impl From<YearSchedule> for YearlyValue {
    fn from(s: YearSchedule) -> Self {
        YearlyValue::Schedule(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_for_falls_back_to_earlier_year() {
        let schedule: YearSchedule = [(2030, 4.0), (2035, 5.0)].into_iter().collect();

        assert_eq!(schedule.value_for(2030), Some(4.0));
        assert_eq!(schedule.value_for(2033), Some(4.0));
        assert_eq!(schedule.value_for(2040), Some(5.0));
        // Before the first year the earliest entry applies
        assert_eq!(schedule.value_for(2020), Some(4.0));
        assert_eq!(YearSchedule::new().value_for(2030), None);
    }

    #[test]
    fn test_deserialize_string_and_integer_keys() {
        let from_json: YearSchedule =
            serde_json::from_str(r#"{"2035": 4.2, "2036": 4.3}"#).unwrap();
        assert_eq!(from_json.get(2035), Some(4.2));

        let from_yaml: YearSchedule = serde_yaml::from_str("2035: 4.2\n2036: 4.3\n").unwrap();
        assert_eq!(from_yaml, from_json);

        let bad: Result<YearSchedule, _> = serde_json::from_str(r#"{"soon": 1.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_serialize_uses_string_keys() {
        let schedule = YearSchedule::flat(2030, 2, 1.5);
        let json = serde_json::to_string(&schedule).unwrap();
        assert_eq!(json, r#"{"2030":1.5,"2031":1.5}"#);
    }

    #[test]
    fn test_yearly_value_untagged() {
        let flat: YearlyValue = serde_json::from_str("3.5").unwrap();
        assert_eq!(flat.value_for(1999), Some(3.5));

        let scheduled: YearlyValue = serde_json::from_str(r#"{"2030": 1.0}"#).unwrap();
        assert!(matches!(scheduled, YearlyValue::Schedule(_)));
        assert_eq!(scheduled.value_for(2031), Some(1.0));
    }
}
