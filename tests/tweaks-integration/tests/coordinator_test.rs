//! Centralized integration tests for the tweaks coordinator
use infrastructure_common::TweaksError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tweaks_abstractions::{
    MutableTweaksProvider, ObserverId, Tweak, TweakPriority, TweakValue, TweaksEventPublisher,
    TweaksProvider, TWEAKS_CONFIGURATION_DID_CHANGE,
};
use tweaks_impl::{JsonTweaksProvider, LocalTweaksProvider, TweaksCoordinator, TweaksEventBus};

const UI_CUSTOMIZATION: &str = "ui_customization";
const GENERAL: &str = "general";
const DISPLAY_RED_VIEW: &str = "display_red_view";
const DISPLAY_YELLOW_VIEW: &str = "display_yellow_view";
const DISPLAY_GREEN_VIEW: &str = "display_green_view";
const GREET_ON_APP_DID_BECOME_ACTIVE: &str = "greet_on_app_did_become_active";
const TAP_TO_CHANGE_COLOR_ENABLED: &str = "tap_to_change_color_enabled";
const RED_VIEW_ALPHA_COMPONENT: &str = "red_view_alpha_component";

/// 模拟远程配置：只按变量名匹配，不区分特性
struct MockRemoteProvider {
    known_values: HashMap<&'static str, bool>,
}

impl MockRemoteProvider {
    fn new() -> Self {
        Self {
            known_values: HashMap::from([
                (DISPLAY_RED_VIEW, true),
                (DISPLAY_YELLOW_VIEW, false),
                (DISPLAY_GREEN_VIEW, false),
                (GREET_ON_APP_DID_BECOME_ACTIVE, true),
            ]),
        }
    }
}

impl TweaksProvider for MockRemoteProvider {
    fn name(&self) -> &str {
        "MockRemoteProvider"
    }

    fn priority(&self) -> TweakPriority {
        TweakPriority::REMOTE
    }

    fn is_feature_enabled(&self, _feature: &str) -> bool {
        false
    }

    fn tweak(&self, _feature: &str, variable: &str) -> Option<Tweak> {
        let value = self.known_values.get(variable)?;
        Some(Tweak::new(variable, *value))
    }

    fn active_variation(&self, _experiment: &str) -> Option<String> {
        None
    }
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test_configuration.json")
}

fn json_provider() -> Arc<JsonTweaksProvider> {
    Arc::new(JsonTweaksProvider::from_path(fixture_path()).unwrap())
}

/// 优先级 10 => 本地覆盖, 5 => 模拟远程, 0 => JSON 默认值
struct Fixture {
    bus: Arc<TweaksEventBus>,
    local: Arc<LocalTweaksProvider>,
    coordinator: TweaksCoordinator,
}

fn fixture() -> Fixture {
    let bus = TweaksEventBus::shared();
    let local = Arc::new(LocalTweaksProvider::new(bus.clone()));
    let providers: Vec<Arc<dyn TweaksProvider>> = vec![
        Arc::new(MockRemoteProvider::new()),
        json_provider(),
        Arc::clone(&local) as Arc<dyn TweaksProvider>,
    ];
    let coordinator = TweaksCoordinator::new(providers, Arc::clone(&bus)).unwrap();
    Fixture {
        bus,
        local,
        coordinator,
    }
}

fn bool_value(coordinator: &TweaksCoordinator, feature: &str, variable: &str) -> bool {
    coordinator
        .value_for_tweak(feature, variable)
        .and_then(|value| value.as_bool())
        .unwrap()
}

#[test]
fn test_none_when_passing_empty_providers() {
    assert!(TweaksCoordinator::new(Vec::new(), TweaksEventBus::shared()).is_none());
}

#[test]
fn test_no_mutable_provider_when_none_passed() {
    let providers: Vec<Arc<dyn TweaksProvider>> = vec![json_provider()];
    let coordinator = TweaksCoordinator::new(providers, TweaksEventBus::shared()).unwrap();
    assert!(coordinator.top_customizable_configuration().is_none());
}

#[test]
fn test_none_for_undefined_tweak() {
    let fixture = fixture();
    assert!(fixture
        .coordinator
        .value_for_tweak(UI_CUSTOMIZATION, "some_undefined_tweak")
        .is_none());
}

#[test]
fn test_remote_value_wins_over_json_defaults() {
    let fixture = fixture();
    let coordinator = &fixture.coordinator;
    assert!(bool_value(coordinator, UI_CUSTOMIZATION, DISPLAY_RED_VIEW));
    assert!(!bool_value(coordinator, UI_CUSTOMIZATION, DISPLAY_YELLOW_VIEW));
    assert!(!bool_value(coordinator, UI_CUSTOMIZATION, DISPLAY_GREEN_VIEW));
    assert!(bool_value(coordinator, UI_CUSTOMIZATION, GREET_ON_APP_DID_BECOME_ACTIVE));
}

#[test]
fn test_json_value_used_when_unknown_to_remote() {
    let fixture = fixture();
    assert!(bool_value(&fixture.coordinator, GENERAL, TAP_TO_CHANGE_COLOR_ENABLED));

    let tweak = fixture
        .coordinator
        .tweak_with(GENERAL, TAP_TO_CHANGE_COLOR_ENABLED)
        .unwrap();
    assert_eq!(tweak.title.as_deref(), Some("Tap to change views color"));
    assert_eq!(tweak.group.as_deref(), Some("General"));
}

#[test]
fn test_user_set_value_wins_after_updating_local_provider() {
    let fixture = fixture();
    let mutable = fixture.coordinator.top_customizable_configuration().unwrap();
    assert_eq!(mutable.name(), fixture.local.name());

    mutable
        .set_value(
            TweakValue::Bool(false),
            UI_CUSTOMIZATION,
            GREET_ON_APP_DID_BECOME_ACTIVE,
        )
        .unwrap();
    assert!(!bool_value(
        &fixture.coordinator,
        UI_CUSTOMIZATION,
        GREET_ON_APP_DID_BECOME_ACTIVE
    ));

    mutable
        .delete_value(UI_CUSTOMIZATION, GREET_ON_APP_DID_BECOME_ACTIVE)
        .unwrap();
    assert!(bool_value(
        &fixture.coordinator,
        UI_CUSTOMIZATION,
        GREET_ON_APP_DID_BECOME_ACTIVE
    ));
}

#[test]
fn test_feature_enabled_follows_priority() {
    let fixture = fixture();
    // 远程没有意见时落到 JSON 默认值
    assert!(fixture.coordinator.is_feature_enabled(UI_CUSTOMIZATION));
    assert!(!fixture.coordinator.is_feature_enabled(GENERAL));

    fixture.local.set_feature_enabled(GENERAL, true).unwrap();
    assert!(fixture.coordinator.is_feature_enabled(GENERAL));
}

#[test]
fn test_calls_closure_for_registered_observer_when_any_provider_changes() {
    let fixture = fixture();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    fixture
        .coordinator
        .register_for_updates(ObserverId::of(&calls), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    fixture.bus.publish(TWEAKS_CONFIGURATION_DID_CHANGE);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    fixture.bus.publish(TWEAKS_CONFIGURATION_DID_CHANGE);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_does_not_call_closure_for_deregistered_observer() {
    let fixture = fixture();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let observer = ObserverId::of(&calls);
    fixture.coordinator.register_for_updates(observer, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    fixture.coordinator.deregister(observer);

    fixture.bus.publish(TWEAKS_CONFIGURATION_DID_CHANGE);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.coordinator.observer_count(), 0);
}

#[test]
fn test_reregistering_replaces_callback() {
    let fixture = fixture();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let observer = ObserverId::of(&first);

    let counter = Arc::clone(&first);
    fixture.coordinator.register_for_updates(observer, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(&second);
    fixture.coordinator.register_for_updates(observer, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    fixture.bus.publish(TWEAKS_CONFIGURATION_DID_CHANGE);
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.coordinator.observer_count(), 1);
}

#[test]
fn test_local_write_notifies_registered_observer() {
    let fixture = fixture();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    fixture
        .coordinator
        .register_for_updates(ObserverId::of(&calls), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    fixture
        .coordinator
        .top_customizable_configuration()
        .unwrap()
        .set_value(TweakValue::from("Hola"), GENERAL, "greeting")
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_variable_is_none_regardless_of_priorities() {
    for (json_priority, local_priority) in [(0, 0), (5, 0), (0, 10), (-3, 7), (7, 7)] {
        let bus = TweaksEventBus::shared();
        let providers: Vec<Arc<dyn TweaksProvider>> = vec![
            Arc::new(MockRemoteProvider::new()),
            Arc::new(
                JsonTweaksProvider::from_path(fixture_path())
                    .unwrap()
                    .with_priority(TweakPriority::new(json_priority)),
            ),
            Arc::new(
                LocalTweaksProvider::new(bus.clone())
                    .with_priority(TweakPriority::new(local_priority)),
            ),
        ];
        let coordinator = TweaksCoordinator::new(providers, bus).unwrap();
        assert!(coordinator
            .value_for_tweak(UI_CUSTOMIZATION, "never_defined")
            .is_none());
        assert!(coordinator.active_variation("never_defined").is_none());
    }
}

#[test]
fn test_persisted_overrides_survive_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = dir.path().join("overrides.json");

    {
        let bus = TweaksEventBus::shared();
        let local = LocalTweaksProvider::with_persistence(bus.clone(), &store)?;
        local.set_value(TweakValue::Bool(false), UI_CUSTOMIZATION, DISPLAY_RED_VIEW)?;
    }

    let bus = TweaksEventBus::shared();
    let providers: Vec<Arc<dyn TweaksProvider>> = vec![
        Arc::new(MockRemoteProvider::new()),
        Arc::new(LocalTweaksProvider::with_persistence(bus.clone(), &store)?),
    ];
    let coordinator = TweaksCoordinator::new(providers, bus).unwrap();
    assert!(!bool_value(&coordinator, UI_CUSTOMIZATION, DISPLAY_RED_VIEW));
    Ok(())
}

#[test]
fn test_missing_defaults_file_is_reported() {
    let result = JsonTweaksProvider::from_path(fixture_path().with_file_name("missing.json"));
    assert!(matches!(result, Err(TweaksError::FileNotFound { .. })));
}

#[test]
fn test_non_finite_override_is_rejected_and_store_stays_loadable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = dir.path().join("overrides.json");
    let bus = TweaksEventBus::shared();
    let providers: Vec<Arc<dyn TweaksProvider>> = vec![
        json_provider(),
        Arc::new(LocalTweaksProvider::with_persistence(bus.clone(), &store)?),
    ];
    let coordinator = TweaksCoordinator::new(providers, bus).unwrap();
    let mutable = coordinator.top_customizable_configuration().unwrap();

    mutable.set_value(TweakValue::Float(0.25), UI_CUSTOMIZATION, RED_VIEW_ALPHA_COMPONENT)?;
    let result = mutable.set_value(
        TweakValue::Float(f64::NAN),
        UI_CUSTOMIZATION,
        RED_VIEW_ALPHA_COMPONENT,
    );
    assert!(matches!(result, Err(TweaksError::InvalidDefinition { .. })));
    assert_eq!(
        coordinator.value_for_tweak(UI_CUSTOMIZATION, RED_VIEW_ALPHA_COMPONENT),
        Some(TweakValue::Float(0.25))
    );

    let reloaded = LocalTweaksProvider::with_persistence(TweaksEventBus::shared(), &store)?;
    assert_eq!(
        reloaded
            .tweak(UI_CUSTOMIZATION, RED_VIEW_ALPHA_COMPONENT)
            .map(|tweak| tweak.value),
        Some(TweakValue::Float(0.25))
    );
    Ok(())
}

#[test]
fn test_overrides_resolve_per_feature_and_variable_pair() {
    let fixture = fixture();
    let mutable = fixture.coordinator.top_customizable_configuration().unwrap();

    mutable.set_value(TweakValue::Bool(true), "a-b", "c").unwrap();
    assert!(fixture.coordinator.value_for_tweak("a", "b-c").is_none());
    assert_eq!(
        fixture.coordinator.value_for_tweak("a-b", "c"),
        Some(TweakValue::Bool(true))
    );
}

#[test]
fn test_structurally_identical_observers_are_distinct() {
    struct View;

    let fixture = fixture();
    let first = Arc::new(View);
    let second = Arc::new(View);
    let calls = Arc::new(AtomicUsize::new(0));
    for view in [&first, &second] {
        let counter = Arc::clone(&calls);
        fixture
            .coordinator
            .register_for_updates(ObserverId::of(view), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
    }

    fixture.bus.publish(TWEAKS_CONFIGURATION_DID_CHANGE);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(fixture.coordinator.observer_count(), 2);
}

#[test]
fn test_features_include_overrides_and_defaults() {
    let fixture = fixture();
    fixture
        .local
        .set_value(TweakValue::from("Hola"), GENERAL, "greeting")
        .unwrap();

    let features = fixture.coordinator.features();
    let general = features.get(GENERAL).unwrap();
    assert!(general.contains(&"greeting".to_string()));
    assert!(general.contains(&TAP_TO_CHANGE_COLOR_ENABLED.to_string()));
    assert!(features
        .get(UI_CUSTOMIZATION)
        .unwrap()
        .contains(&DISPLAY_RED_VIEW.to_string()));
}
