/// `UPDATER_VERSION` at build time, otherwise the crate version.
pub const VERSION: &str = match option_env!("UPDATER_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

#[cfg(test)]
mod tests {
    use super::VERSION;

    #[test]
    fn test_version_is_set() {
        match option_env!("UPDATER_VERSION") {
            Some(version) => assert_eq!(VERSION, version),
            None => assert_eq!(VERSION, env!("CARGO_PKG_VERSION")),
        }
    }
}
