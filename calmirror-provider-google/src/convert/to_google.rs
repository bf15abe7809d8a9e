use calmirror_core::{EventPayload, PayloadTime};

use crate::convert::ToGoogle;

impl ToGoogle<google_calendar::types::Event> for EventPayload {
    fn to_google(&self) -> google_calendar::types::Event {
        google_calendar::types::Event {
            summary: self.summary.clone(),
            location: self.location.clone().unwrap_or_default(),
            start: Some(payload_time_to_google(&self.start)),
            end: Some(payload_time_to_google(&self.end)),
            color_id: self.color_tag.clone(),
            ..Default::default()
        }
    }
}

fn payload_time_to_google(time: &PayloadTime) -> google_calendar::types::EventDateTime {
    google_calendar::types::EventDateTime {
        date: None,
        date_time: Some(time.date_time),
        time_zone: time.time_zone.clone(),
    }
}
