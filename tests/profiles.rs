use std::collections::HashMap;
use std::time::Duration;
use turnstile::{ConfigError, KeyStrategy, Profile, ProfileSet, ProfileSettings};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
}

#[test]
fn default_profiles_are_guest_50_auth_5_user_100() {
    let settings = ProfileSettings::from_lookup(|_| None).unwrap();

    assert_eq!(settings.guest.capacity(), 50);
    assert_eq!(settings.auth.capacity(), 5);
    assert_eq!(settings.user.capacity(), 100);
    assert_eq!(settings.guest.window(), Duration::from_secs(60));
    assert_eq!(settings.auth.window(), Duration::from_secs(60));
    assert_eq!(settings.user.window(), Duration::from_secs(60));
}

#[test]
fn each_profile_reads_its_own_variables() {
    let settings = ProfileSettings::from_lookup(lookup(&[
        ("RATE_LIMIT_GUEST_POINTS", "10"),
        ("RATE_LIMIT_GUEST_DURATION", "30"),
        ("RATE_LIMIT_AUTH_POINTS", "2"),
        ("RATE_LIMIT_USER_POINTS", "500"),
        ("RATE_LIMIT_USER_DURATION", "300"),
    ]))
    .unwrap();

    assert_eq!(settings.guest.capacity(), 10);
    assert_eq!(settings.guest.window(), Duration::from_secs(30));
    assert_eq!(settings.auth.capacity(), 2);
    assert_eq!(settings.auth.window(), Duration::from_secs(60));
    assert_eq!(settings.user.capacity(), 500);
    assert_eq!(settings.user.window(), Duration::from_secs(300));
}

#[test]
fn misconfigured_profile_refuses_to_construct() {
    // capacity = 0 is a startup error, never a silent default.
    let err = ProfileSettings::from_lookup(lookup(&[("RATE_LIMIT_USER_POINTS", "0")]))
        .unwrap_err();
    assert_eq!(err, ConfigError::ZeroCapacity);

    let err = ProfileSettings::from_lookup(lookup(&[("RATE_LIMIT_AUTH_DURATION", "banana")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref name, .. }
        if name == "RATE_LIMIT_AUTH_DURATION"));
}

#[test]
fn profile_set_exposes_one_limiter_per_profile() {
    let set = ProfileSet::new(ProfileSettings::from_lookup(lookup(&[
        ("RATE_LIMIT_GUEST_POINTS", "3"),
        ("RATE_LIMIT_AUTH_POINTS", "1"),
        ("RATE_LIMIT_USER_POINTS", "2"),
    ]))
    .unwrap());

    assert_eq!(set.limiter(Profile::Guest).config().capacity(), 3);
    assert_eq!(set.limiter(Profile::Auth).config().capacity(), 1);
    assert_eq!(set.limiter(Profile::User).config().capacity(), 2);

    // Same key, three independent bucket populations.
    assert!(set.limiter(Profile::Auth).consume("1.2.3.4").is_admitted());
    assert!(!set.limiter(Profile::Auth).consume("1.2.3.4").is_admitted());
    assert!(set.limiter(Profile::Guest).consume("1.2.3.4").is_admitted());
    assert!(set.limiter(Profile::User).consume("1.2.3.4").is_admitted());
}

#[test]
fn guards_use_the_canonical_strategy_per_profile() {
    assert_eq!(Profile::Guest.key_strategy(), KeyStrategy::Ip);
    assert_eq!(Profile::Auth.key_strategy(), KeyStrategy::Ip);
    assert_eq!(Profile::User.key_strategy(), KeyStrategy::PrincipalOrIp);

    let set = ProfileSet::new(ProfileSettings::from_lookup(|_| None).unwrap());
    let guard = set.guard(Profile::Guest);
    assert_eq!(guard.limiter().config().capacity(), 50);
}
