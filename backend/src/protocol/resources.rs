//! Demo resources
//!
//! Short task prompts a client can read to drive a scripted session.

use serde::Serialize;

pub const MIME_TYPE: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DemoResource {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub text: &'static str,
}

pub const DEMO_RESOURCES: &[DemoResource] = &[
    DemoResource {
        uri: "mcp-com://demos/sapi-greeting",
        name: "sapi-greeting",
        description: "Makes the computer speak a greeting",
        text: "Use the SAPI.SpVoice object and say 'Greetings from the automation bridge!'",
    },
    DemoResource {
        uri: "mcp-com://demos/demo-ie",
        name: "demo-ie",
        description: "Opens a browser and navigates to a URL",
        text: "Open InternetExplorer.Application, make it visible and navigate to https://example.com",
    },
    DemoResource {
        uri: "mcp-com://demos/open-excel",
        name: "open-excel",
        description: "Opens Excel and writes into a new worksheet",
        text: "Open Excel and write 'Hello, world' into a new worksheet",
    },
];

pub fn find(uri: &str) -> Option<&'static DemoResource> {
    DEMO_RESOURCES.iter().find(|resource| resource.uri == uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_uri() {
        assert_eq!(find("mcp-com://demos/open-excel").map(|r| r.name), Some("open-excel"));
        assert!(find("mcp-com://demos/missing").is_none());
    }

    #[test]
    fn test_text_is_not_listed() {
        let listed = serde_json::to_value(DEMO_RESOURCES[0]).unwrap();
        assert!(listed.get("text").is_none());
        assert_eq!(listed["uri"], "mcp-com://demos/sapi-greeting");
    }
}
