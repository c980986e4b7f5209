use std::sync::{Arc, Mutex};
use std::time::Duration;

use reactive_models::operators::{buffer_changes, debounce_changes, map_to_value, where_event_type, where_field, where_model};
use reactive_models::{
    Event, EventType, FieldSpec, FieldType, ModelSchema, ModelType, ObservedEvent, Registry, SubscriberError,
    Subscription, Value,
};

fn product_type(registry: &Registry) -> ModelType {
    let schema = ModelSchema::builder("Product")
        .field(FieldSpec::new("name", FieldType::String).default_value(""))
        .field(FieldSpec::new("price", FieldType::Float).default_value(1.0).gt(0.0))
        .field(FieldSpec::new("stock", FieldType::Int).default_value(0).ge(0.0))
        .build()
        .unwrap();
    registry.register_model_type(schema).unwrap()
}

fn order_type(registry: &Registry) -> ModelType {
    let schema = ModelSchema::builder("Order")
        .field(FieldSpec::new("status", FieldType::String).default_value("pending"))
        .field(FieldSpec::new("customer_id", FieldType::String).nullable())
        .build()
        .unwrap();
    registry.register_model_type(schema).unwrap()
}

#[test]
fn where_field_then_map_to_value() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let prices = products
        .observe_model()
        .pipe(where_field("price"))
        .pipe(where_event_type(EventType::FieldChanged))
        .pipe(map_to_value())
        .listen();

    let widget = products.create([("name", "widget")]).unwrap();
    widget.set("stock", 5).unwrap();
    widget.set("price", 2.5).unwrap();
    widget.set("price", 3).unwrap();

    assert_eq!(prices.drain(), vec![Value::Float(2.5), Value::Float(3.0)]);
}

#[test]
fn where_model_narrows_type_stream() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let a = products.create_default().unwrap();
    let b = products.create_default().unwrap();

    let only_b = products.observe_field("stock").unwrap().pipe(where_model(b.id())).listen();
    a.set("stock", 1).unwrap();
    b.set("stock", 2).unwrap();

    let events = only_b.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].instance_id(), b.id());
}

#[test]
fn validation_failures_are_observable() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let widget = products.create_default().unwrap();
    let failures = products
        .observe_model()
        .pipe(where_event_type(EventType::ValidationFailure))
        .listen();

    assert!(widget.set("price", -4.0).is_err());
    assert!(widget.set("stock", -1).is_err());
    assert!(widget.set("price", 9.99).is_ok());

    let fields: Vec<String> = failures
        .drain()
        .iter()
        .filter_map(|e| e.field_name().map(str::to_string))
        .collect();
    assert_eq!(fields, vec!["price".to_string(), "stock".to_string()]);
}

#[test]
fn debounce_changes_composes_with_field_stream() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let widget = products.create_default().unwrap();
    let settled = products
        .observe_field("stock")
        .unwrap()
        .pipe(debounce_changes(Duration::from_millis(80)))
        .listen();

    for stock in 1..=5 {
        widget.set("stock", stock).unwrap();
    }

    let last = settled.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(last.old_value(), &Value::Int(4));
    assert_eq!(last.new_value(), &Value::Int(5));
    assert!(settled.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn field_debounce_and_debounce_changes_compose() {
    let registry = Registry::new();
    let schema = ModelSchema::builder("Search")
        .field(FieldSpec::new("query", FieldType::String).default_value("").debounce_ms(50))
        .build()
        .unwrap();
    let searches = registry.register_model_type(schema).unwrap();
    let search = searches.create_default().unwrap();

    let raw = searches.observe_field("query").unwrap().listen();
    let settled = searches
        .observe_field("query")
        .unwrap()
        .pipe(debounce_changes(Duration::from_millis(100)))
        .listen();

    for query in ["r", "ru", "rus", "rust"] {
        search.set("query", query).unwrap();
    }

    // The field window collapses the burst; the operator sees that one event.
    let change = settled.recv_timeout(Duration::from_secs(3)).unwrap();
    assert_eq!(change.old_value(), &Value::from(""));
    assert_eq!(change.new_value(), &Value::from("rust"));
    assert!(settled.recv_timeout(Duration::from_millis(400)).is_err());

    let raw = raw.drain();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].event_id(), change.event_id());
}

#[test]
fn buffer_changes_groups_events() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let widget = products.create_default().unwrap();
    let batches = products.observe_field("stock").unwrap().pipe(buffer_changes(3)).listen();

    for stock in 1..=7 {
        widget.set("stock", stock).unwrap();
    }

    let batches = batches.drain();
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|batch| batch.len() == 3));
}

#[test]
fn streams_of_different_models_merge() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let orders = order_type(&registry);

    let merged = products
        .observe_model()
        .merge(orders.observe_model())
        .pipe(where_event_type(EventType::FieldChanged))
        .listen();

    let widget = products.create_default().unwrap();
    let order = orders.create([("customer_id", "c-1")]).unwrap();
    widget.set("name", "widget").unwrap();
    order.set("status", "paid").unwrap();

    let types: Vec<String> = merged
        .drain()
        .iter()
        .map(|e: &Event| e.header().model_type().to_string())
        .collect();
    assert_eq!(types, vec!["Product".to_string(), "Order".to_string()]);
}

#[test]
fn failing_subscriber_does_not_reach_writer() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let widget = products.create_default().unwrap();

    let _panics = products.observe_field("name").unwrap().subscribe(|_| panic!("observer bug"));
    let _errors = products
        .observe_field("name")
        .unwrap()
        .try_subscribe(|_| Err::<(), _>("rejected by observer"));
    let later = products.observe_field("name").unwrap().listen();

    widget.set("name", "gadget").unwrap();

    assert_eq!(later.len(), 1);
    assert_eq!(registry.diagnostics().subscriber_failures(), 2);
    assert!(matches!(
        registry.diagnostics().last_failure(),
        Some(SubscriberError::Failed { .. })
    ));
}

#[test]
fn subscriber_may_subscribe_during_delivery() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let widget = products.create_default().unwrap();

    let late: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
    let late_hits = Arc::new(Mutex::new(0));

    let slot = Arc::clone(&late);
    let hits = Arc::clone(&late_hits);
    let stream = products.observe_field("stock").unwrap();
    let inner_stream = stream.clone();
    let _first = stream.subscribe(move |_| {
        let hits = Arc::clone(&hits);
        let sub = inner_stream.subscribe(move |_| *hits.lock().unwrap() += 1);
        slot.lock().unwrap().push(sub);
    });

    widget.set("stock", 1).unwrap();
    // Added during the first delivery; sees only later events.
    assert_eq!(*late_hits.lock().unwrap(), 0);

    widget.set("stock", 2).unwrap();
    assert_eq!(*late_hits.lock().unwrap(), 1);
}

#[test]
fn chained_reaction_updates_another_model() {
    let registry = Registry::new();
    let products = product_type(&registry);
    let orders = order_type(&registry);
    let widget = products.create([("stock", 1)]).unwrap();
    let order = orders.create([("customer_id", "c-9")]).unwrap();

    let order_handle = order.downgrade();
    let _reaction = widget
        .observe_instance_field("stock")
        .unwrap()
        .subscribe(move |change| {
            if change.new_value() == &Value::Int(0) {
                if let Some(order) = order_handle.upgrade() {
                    order.set("status", "backordered").unwrap();
                }
            }
        });

    widget.set("stock", 0).unwrap();
    assert_eq!(order.get("status").unwrap(), Value::from("backordered"));
}
