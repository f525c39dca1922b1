use messenger_client::settings::Env;

#[test]
fn local_env_points_at_the_local_api() {
    assert_eq!(Env::Local.api_base().as_str(), "http://localhost:8000/api");
}

#[test]
fn env_names_match_the_deployment_convention() {
    assert_eq!(Env::Local.to_string(), "local");
    assert_eq!(Env::Stage.to_string(), "stg");
    assert_eq!(Env::Production.to_string(), "prod");
}
