use std::sync::LazyLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Days,
  Local,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

const FORM_DATE_FORMAT: &str =
  "%Y-%m-%d";
const DISPLAY_DATE_FORMAT: &str =
  "%d/%m/%Y";

static RELATIVE_DATE_RE: LazyLock<
  Regex
> = LazyLock::new(|| {
  Regex::new(
    r"^\+(?P<num>\d+)(?P<unit>[dw])$"
  )
  .expect(
    "relative date pattern is valid"
  )
});

/// Parses a configured IANA timezone
/// id. Empty or unknown ids yield
/// `None` so callers fall back to the
/// system offset.
pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Calendar day of `now` as seen from
/// `tz`, or from the system offset when
/// no timezone is configured.
#[must_use]
pub fn today(
  tz: Option<Tz>,
  now: DateTime<Utc>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      now.with_timezone(&tz).date_naive()
    }
    | None => {
      now.with_timezone(&Local)
        .date_naive()
    }
  }
}

/// Earliest date a date picker should
/// offer.
#[must_use]
pub fn min_date(
  today: NaiveDate
) -> NaiveDate {
  today
}

#[must_use]
pub fn format_date(
  date: Option<NaiveDate>,
  today: NaiveDate
) -> String {
  let Some(date) = date else {
    return String::new();
  };

  let formatted = date
    .format(DISPLAY_DATE_FORMAT)
    .to_string();

  if date == today {
    return format!(
      "Today - {formatted}"
    );
  }

  if today
    .checked_add_days(Days::new(1))
    .is_some_and(|tomorrow| {
      tomorrow == date
    })
  {
    return format!(
      "Tomorrow - {formatted}"
    );
  }

  formatted
}

/// Same as [`format_date`] for the
/// `YYYY-MM-DD` form used in storage.
/// Unparsable input renders as empty.
#[must_use]
pub fn format_date_str(
  raw: &str,
  today: NaiveDate
) -> String {
  format_date(
    parse_form_date(raw),
    today
  )
}

pub(crate) fn parse_form_date(
  raw: &str
) -> Option<NaiveDate> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  NaiveDate::parse_from_str(
    trimmed,
    FORM_DATE_FORMAT
  )
  .ok()
}

/// Date input accepted on the command
/// line: `YYYY-MM-DD`, `today`,
/// `tomorrow`, `+Nd` or `+Nw`.
#[tracing::instrument(skip(today))]
pub fn parse_date_input(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "date out of range: \
             tomorrow"
          )
        });
    }
    | _ => {}
  }

  if let Some(caps) =
    RELATIVE_DATE_RE.captures(&lower)
  {
    let num: u64 = caps["num"]
      .parse()
      .context(
        "invalid relative date \
         amount"
      )?;
    let days = match &caps["unit"] {
      | "w" => num.saturating_mul(7),
      | _ => num
    };
    return today
      .checked_add_days(Days::new(days))
      .ok_or_else(|| {
        anyhow!(
          "date out of range: {token}"
        )
      });
  }

  NaiveDate::parse_from_str(
    token,
    FORM_DATE_FORMAT
  )
  .with_context(|| {
    format!(
      "invalid date '{token}'; \
       expected YYYY-MM-DD, today, \
       tomorrow, +Nd or +Nw"
    )
  })
}

/// Serializes an optional date the way
/// the form input stores it: `""` when
/// absent, `YYYY-MM-DD` otherwise.
pub mod form_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::FORM_DATE_FORMAT;

  pub fn serialize<S>(
    date: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match date {
      | Some(value) => {
        serializer.serialize_str(
          &value
            .format(FORM_DATE_FORMAT)
            .to_string()
        )
      }
      | None => {
        serializer.serialize_str("")
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = Option::<String>::deserialize(
      deserializer
    )?;
    let Some(raw) = raw else {
      return Ok(None);
    };

    let parsed =
      super::parse_form_date(&raw);
    if parsed.is_none()
      && !raw.trim().is_empty()
    {
      tracing::debug!(
        raw = %raw,
        "ignoring unparsable stored date"
      );
    }
    Ok(parsed)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    format_date,
    format_date_str,
    parse_date_input,
    parse_timezone,
    today
  };

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn labels_today_and_tomorrow() {
    let now = day(2025, 9, 10);
    assert_eq!(
      format_date(Some(now), now),
      "Today - 10/09/2025"
    );
    assert_eq!(
      format_date(
        Some(day(2025, 9, 11)),
        now
      ),
      "Tomorrow - 11/09/2025"
    );
    assert_eq!(
      format_date(
        Some(day(2025, 9, 9)),
        now
      ),
      "09/09/2025"
    );
    assert_eq!(
      format_date(
        Some(day(2026, 1, 2)),
        now
      ),
      "02/01/2026"
    );
  }

  #[test]
  fn tomorrow_crosses_month_and_year() {
    let now = day(2025, 12, 31);
    assert_eq!(
      format_date(
        Some(day(2026, 1, 1)),
        now
      ),
      "Tomorrow - 01/01/2026"
    );
  }

  #[test]
  fn absent_or_empty_date_is_blank() {
    let now = day(2025, 9, 10);
    assert_eq!(format_date(None, now), "");
    assert_eq!(
      format_date_str("", now),
      ""
    );
    assert_eq!(
      format_date_str("not-a-date", now),
      ""
    );
    assert_eq!(
      format_date_str("2025-09-10", now),
      "Today - 10/09/2025"
    );
  }

  #[test]
  fn parses_cli_date_inputs() {
    let now = day(2025, 9, 10);
    assert_eq!(
      parse_date_input("today", now)
        .expect("today"),
      now
    );
    assert_eq!(
      parse_date_input("Tomorrow", now)
        .expect("tomorrow"),
      day(2025, 9, 11)
    );
    assert_eq!(
      parse_date_input("+3d", now)
        .expect("relative days"),
      day(2025, 9, 13)
    );
    assert_eq!(
      parse_date_input("+2w", now)
        .expect("relative weeks"),
      day(2025, 9, 24)
    );
    assert_eq!(
      parse_date_input("2025-10-01", now)
        .expect("iso"),
      day(2025, 10, 1)
    );
    assert!(
      parse_date_input("soon", now)
        .is_err()
    );
  }

  #[test]
  fn relative_offsets_reject_other_shapes()
  {
    let now = day(2025, 9, 10);
    assert_eq!(
      parse_date_input("+0D", now)
        .expect("zero days"),
      now
    );
    for bad in ["+3m", "3d", "+d", "+-1w"] {
      assert!(
        parse_date_input(bad, now)
          .is_err(),
        "{bad} should be rejected"
      );
    }
  }

  #[test]
  fn today_follows_configured_timezone()
  {
    let now = Utc
      .with_ymd_and_hms(
        2025, 9, 10, 2, 0, 0
      )
      .single()
      .expect("valid now");
    let tz = parse_timezone(
      "America/Sao_Paulo",
      "test"
    );
    assert!(tz.is_some());
    assert_eq!(
      today(tz, now),
      day(2025, 9, 9)
    );
    assert!(
      parse_timezone("Mars/Olympus", "test")
        .is_none()
    );
  }
}
