//! Connection lifecycle events carried by NETWORK component lines.

use regex::Regex;
use std::sync::LazyLock;

/// Component name of network lines.
pub const NETWORK_COMPONENT: &str = "NETWORK";

/// Context of the line announcing new connections.
pub const LISTENER_CONTEXT: &str = "[listener]";

// connection accepted from 10.178.5.250:47878 #2078609 (252 connections now open)
static RE_ACCEPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"connection accepted from (?P<ip>\S+):(?P<port>\d+) #(?P<id>\d+)").unwrap()
});

// received client metadata from 10.178.5.250:47876 conn2078608: { driver: { name: "PyMongo" } }
static RE_METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"received client metadata from (?P<ip>\S+):(?P<port>\d+) (?P<id>[a-z\d]+): (?P<metadata>.*)",
    )
    .unwrap()
});

// end connection 127.0.0.1:42266 (250 connections now open)
static RE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"end connection (?P<ip>\S+):(?P<port>\d+)").unwrap());

/// A connection transition recognized in a NETWORK message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent<'a> {
    Accept {
        ip: &'a str,
        port: &'a str,
        id: &'a str,
    },
    Metadata {
        ip: &'a str,
        port: &'a str,
        id: &'a str,
        metadata: &'a str,
    },
    Close {
        ip: &'a str,
        port: &'a str,
    },
}

pub fn parse_accept(message: &str) -> Option<NetworkEvent<'_>> {
    let caps = RE_ACCEPT.captures(message)?;
    Some(NetworkEvent::Accept {
        ip: caps.name("ip")?.as_str(),
        port: caps.name("port")?.as_str(),
        id: caps.name("id")?.as_str(),
    })
}

pub fn parse_metadata(message: &str) -> Option<NetworkEvent<'_>> {
    let caps = RE_METADATA.captures(message)?;
    Some(NetworkEvent::Metadata {
        ip: caps.name("ip")?.as_str(),
        port: caps.name("port")?.as_str(),
        id: caps.name("id")?.as_str(),
        metadata: caps.name("metadata")?.as_str(),
    })
}

pub fn parse_close(message: &str) -> Option<NetworkEvent<'_>> {
    let caps = RE_END.captures(message)?;
    Some(NetworkEvent::Close {
        ip: caps.name("ip")?.as_str(),
        port: caps.name("port")?.as_str(),
    })
}

/// Recognize the event on a NETWORK line.
///
/// Accepts are only reported by the listener; any other context may carry
/// client metadata or, failing that, a connection end.
pub fn classify<'a>(context: &str, message: &'a str) -> Option<NetworkEvent<'a>> {
    if context == LISTENER_CONTEXT {
        parse_accept(message)
    } else {
        parse_metadata(message).or_else(|| parse_close(message))
    }
}
