// Testing Tools Library
//
// Manual integration checks against a running print shop backend.
// Currently includes:
// - stream-probe: realtime stream and CSRF probe

pub mod output;
pub mod probe;
pub mod scenarios;
