//! Destination naming shared by the server and its clients.
//!
//! Destinations under [`TOPIC_PREFIX`] are broker channels that clients
//! subscribe to. Destinations under [`APP_PREFIX`] are handled by the server
//! itself before anything is broadcast.

pub const TOPIC_PREFIX: &str = "/topic/";
pub const APP_PREFIX: &str = "/app/";

const NEW_POINT: &str = "newpoint.";
const NEW_POLYGON: &str = "newpolygon.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    /// A point submitted to a drawing session. Carries the session id.
    NewPoint(&'a str),
    /// Relayed as-is to the subscribers of this topic.
    Topic(&'a str),
}

pub fn point_topic(session_id: &str) -> String {
    format!("{}{}{}", TOPIC_PREFIX, NEW_POINT, session_id)
}

pub fn polygon_topic(session_id: &str) -> String {
    format!("{}{}{}", TOPIC_PREFIX, NEW_POLYGON, session_id)
}

/// Classifies the destination of an inbound `send` frame.
///
/// The session id of `/app/newpoint.<id>` is everything after `newpoint.`,
/// taken verbatim.
pub fn route(destination: &str) -> Option<Route<'_>> {
    if let Some(rest) = destination.strip_prefix(APP_PREFIX) {
        rest.strip_prefix(NEW_POINT).map(Route::NewPoint)
    } else if destination.starts_with(TOPIC_PREFIX) {
        Some(Route::Topic(destination))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_build_session_topics() {
        assert_eq!(point_topic("42"), "/topic/newpoint.42");
        assert_eq!(polygon_topic("42"), "/topic/newpolygon.42");
    }

    #[test]
    fn it_should_extract_session_id_from_app_destination() {
        assert_eq!(route("/app/newpoint.7"), Some(Route::NewPoint("7")));
        assert_eq!(route("/app/newpoint.a.b"), Some(Route::NewPoint("a.b")));
        assert_eq!(route("/app/newpoint."), Some(Route::NewPoint("")));
    }

    #[test]
    fn it_should_pass_topic_destinations_through() {
        assert_eq!(
            route("/topic/newpoint.7"),
            Some(Route::Topic("/topic/newpoint.7"))
        );
    }

    #[test]
    fn it_should_reject_unknown_destinations() {
        assert_eq!(route("/app/newpolygon.7"), None);
        assert_eq!(route("/queue/whatever"), None);
        assert_eq!(route("newpoint.7"), None);
    }
}
