use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Local,
  NaiveDate,
  SecondsFormat,
  SubsecRound,
  Utc
};
use chrono_tz::Tz;

/// Timezone used to decide which calendar day a timestamp falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
  Local,
  Named(Tz)
}

impl DisplayZone {
  pub fn resolve(
    configured: Option<&str>
  ) -> anyhow::Result<Self> {
    match configured.map(str::trim) {
      | None | Some("") | Some("local") => {
        Ok(Self::Local)
      }
      | Some(name) => name
        .parse::<Tz>()
        .map(Self::Named)
        .map_err(|err| {
          anyhow!(
            "invalid display.timezone \
             {name:?}: {err}"
          )
        })
    }
  }

  #[must_use]
  pub fn date_of(
    self,
    dt: DateTime<Utc>
  ) -> NaiveDate {
    match self {
      | Self::Local => dt
        .with_timezone(&Local)
        .date_naive(),
      | Self::Named(tz) => {
        dt.with_timezone(&tz).date_naive()
      }
    }
  }
}

/// Drops sub-millisecond precision so a
/// timestamp survives a trip through its
/// persisted text form unchanged.
#[must_use]
pub fn truncate_to_millis(
  dt: DateTime<Utc>
) -> DateTime<Utc> {
  dt.trunc_subsecs(3)
}

#[must_use]
pub fn format_timestamp(
  dt: DateTime<Utc>
) -> String {
  dt.to_rfc3339_opts(
    SecondsFormat::Millis,
    true
  )
}

pub fn parse_timestamp(
  raw: &str
) -> anyhow::Result<DateTime<Utc>> {
  let trimmed = raw.trim();
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(trimmed)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  let date = NaiveDate::parse_from_str(
    trimmed, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "unrecognized timestamp {trimmed:?}"
    )
  })?;
  date
    .and_hms_opt(0, 0, 0)
    .map(|ndt| ndt.and_utc())
    .ok_or_else(|| {
      anyhow!(
        "unrecognized timestamp \
         {trimmed:?}"
      )
    })
}

/// `Today`, `Yesterday`, or a short
/// month-day label such as `Oct 3`.
#[must_use]
pub fn created_label(
  created: DateTime<Utc>,
  now: DateTime<Utc>,
  zone: DisplayZone
) -> String {
  let day = zone.date_of(created);
  let today = zone.date_of(now);

  if day >= today {
    return "Today".to_string();
  }
  if today
    .pred_opt()
    .is_some_and(|yesterday| day >= yesterday)
  {
    return "Yesterday".to_string();
  }
  day.format("%b %-d").to_string()
}

pub mod timestamp_serde {
  use chrono::{
    DateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_timestamp(*dt)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_timestamp(&raw)
      .map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    DisplayZone,
    created_label,
    format_timestamp,
    parse_timestamp,
    truncate_to_millis
  };

  fn utc_zone() -> DisplayZone {
    DisplayZone::resolve(Some("UTC"))
      .expect("utc zone")
  }

  #[test]
  fn formats_with_millis_and_z_suffix()
  {
    let dt = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 9, 30, 0
      )
      .single()
      .expect("valid dt");
    assert_eq!(
      format_timestamp(dt),
      "2026-10-18T09:30:00.000Z"
    );
  }

  #[test]
  fn parses_offsets_and_bare_dates() {
    let with_offset = parse_timestamp(
      "2026-10-18T11:30:00+02:00"
    )
    .expect("offset timestamp");
    assert_eq!(
      format_timestamp(with_offset),
      "2026-10-18T09:30:00.000Z"
    );

    let bare = parse_timestamp(
      "2026-10-18"
    )
    .expect("bare date");
    assert_eq!(
      format_timestamp(bare),
      "2026-10-18T00:00:00.000Z"
    );

    assert!(
      parse_timestamp("yesterday-ish")
        .is_err()
    );
  }

  #[test]
  fn millis_truncation_round_trips() {
    let now = truncate_to_millis(
      Utc::now()
    );
    let parsed = parse_timestamp(
      &format_timestamp(now)
    )
    .expect("reparse");
    assert_eq!(parsed, now);
  }

  #[test]
  fn labels_today_yesterday_and_older()
  {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let zone = utc_zone();

    let earlier_today = Utc
      .with_ymd_and_hms(
        2026, 10, 18, 0, 5, 0
      )
      .single()
      .expect("valid dt");
    let yesterday = Utc
      .with_ymd_and_hms(
        2026, 10, 17, 23, 59, 0
      )
      .single()
      .expect("valid dt");
    let older = Utc
      .with_ymd_and_hms(
        2026, 10, 3, 8, 0, 0
      )
      .single()
      .expect("valid dt");

    assert_eq!(
      created_label(
        earlier_today,
        now,
        zone
      ),
      "Today"
    );
    assert_eq!(
      created_label(yesterday, now, zone),
      "Yesterday"
    );
    assert_eq!(
      created_label(older, now, zone),
      "Oct 3"
    );
  }

  #[test]
  fn rejects_unknown_timezone() {
    assert!(
      DisplayZone::resolve(Some(
        "Mars/Olympus_Mons"
      ))
      .is_err()
    );
    assert_eq!(
      DisplayZone::resolve(None)
        .expect("local"),
      DisplayZone::Local
    );
  }
}
