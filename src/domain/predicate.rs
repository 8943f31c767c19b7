//! Names of the legacy `name = value` condition predicates.

use std::fmt;

/// A predicate that can appear on the left of a `name = value` atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    DayOfMonth,
    DayOfWeek,
    DayOfYear,
    Hour,
    Minute,
    Month,
    Year,
    Hostname,
    Ip,
    ApplicationContext,
    UserGroup,
    LoginUser,
    Language,
    Feature,
    UserFunc,
    Unknown,
}

impl Predicate {
    /// Map a predicate name to its variant. Names are case-sensitive, except
    /// that `IP` is also accepted as `ip`.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "dayofmonth" => Predicate::DayOfMonth,
            "dayofweek" => Predicate::DayOfWeek,
            "dayofyear" => Predicate::DayOfYear,
            "hour" => Predicate::Hour,
            "minute" => Predicate::Minute,
            "month" => Predicate::Month,
            "year" => Predicate::Year,
            "hostname" => Predicate::Hostname,
            "IP" | "ip" => Predicate::Ip,
            "applicationContext" => Predicate::ApplicationContext,
            "usergroup" => Predicate::UserGroup,
            "loginUser" => Predicate::LoginUser,
            "language" => Predicate::Language,
            "feature" => Predicate::Feature,
            "userFunc" => Predicate::UserFunc,
            _ => Predicate::Unknown,
        }
    }

    /// PHP `date()` code for the date family.
    pub fn date_format(self) -> Option<&'static str> {
        match self {
            Predicate::DayOfMonth => Some("j"),
            Predicate::DayOfWeek => Some("w"),
            Predicate::DayOfYear => Some("z"),
            Predicate::Hour => Some("G"),
            Predicate::Minute => Some("i"),
            Predicate::Month => Some("n"),
            Predicate::Year => Some("Y"),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Predicate::DayOfMonth => "dayofmonth",
            Predicate::DayOfWeek => "dayofweek",
            Predicate::DayOfYear => "dayofyear",
            Predicate::Hour => "hour",
            Predicate::Minute => "minute",
            Predicate::Month => "month",
            Predicate::Year => "year",
            Predicate::Hostname => "hostname",
            Predicate::Ip => "IP",
            Predicate::ApplicationContext => "applicationContext",
            Predicate::UserGroup => "usergroup",
            Predicate::LoginUser => "loginUser",
            Predicate::Language => "language",
            Predicate::Feature => "feature",
            Predicate::UserFunc => "userFunc",
            Predicate::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
