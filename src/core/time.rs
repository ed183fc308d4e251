use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Whole seconds from `earlier` to `later`, clamped at zero.
pub(crate) fn seconds_between(earlier: PrimitiveDateTime, later: PrimitiveDateTime) -> i64 {
    (later - earlier).whole_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn format_primitive_outputs_utc_z() {
        let value = datetime!(2025-01-02 10:20:30);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn seconds_between_never_goes_negative() {
        let start = datetime!(2025-03-01 09:00:00);
        let later = datetime!(2025-03-01 09:12:30);
        assert_eq!(seconds_between(start, later), 750);
        assert_eq!(seconds_between(later, start), 0);
    }
}
