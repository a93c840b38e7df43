use crate::locator::LocatorService;

pub struct AppState {
    pub locator: LocatorService,
    /// Key clients on the first `X-Forwarded-For` hop. Only safe behind a
    /// proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}
