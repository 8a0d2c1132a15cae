// Catalog hooks mounted in a headless VirtualDom

use dioxus::{dioxus_core::NoOpMutations, prelude::*};
use dioxus_clinic_queries::prelude::*;
use futures::{FutureExt, future::BoxFuture};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn clinic(id: u64, name: &str) -> Clinic {
    Clinic {
        id,
        name: name.to_string(),
    }
}

/// Clinics come from a swappable list, products always fail
struct CountingCatalog {
    clinics: Mutex<Vec<Clinic>>,
    clinic_calls: AtomicUsize,
    product_calls: AtomicUsize,
}

impl CountingCatalog {
    fn new(clinics: Vec<Clinic>) -> Self {
        Self {
            clinics: Mutex::new(clinics),
            clinic_calls: AtomicUsize::new(0),
            product_calls: AtomicUsize::new(0),
        }
    }

    fn set_clinics(&self, clinics: Vec<Clinic>) {
        *self.clinics.lock().unwrap() = clinics;
    }
}

impl CatalogService for CountingCatalog {
    fn fetch_all_clinics(&self) -> BoxFuture<'_, Result<Vec<Clinic>, FetchError>> {
        async move {
            self.clinic_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(self.clinics.lock().unwrap().clone())
        }
        .boxed()
    }

    fn fetch_all_products(&self) -> BoxFuture<'_, Result<Vec<Product>, FetchError>> {
        async move {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(FetchError::new("network error"))
        }
        .boxed()
    }

    fn fetch_user_clinics(&self) -> BoxFuture<'_, Result<Vec<Clinic>, FetchError>> {
        async { Ok(Vec::new()) }.boxed()
    }
}

/// What a view saw on one render
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    label: &'static str,
    loading: bool,
    data: Option<Vec<String>>,
    error: Option<String>,
}

/// Every render of every view, in order
#[derive(Clone, Default)]
struct Renders(Rc<RefCell<Vec<Snapshot>>>);

impl Renders {
    fn record(
        &self,
        label: &'static str,
        loading: bool,
        data: Option<Vec<String>>,
        error: Option<FetchError>,
    ) {
        self.0.borrow_mut().push(Snapshot {
            label,
            loading,
            data,
            error: error.map(|e| e.to_string()),
        });
    }

    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn of(&self, label: &str) -> Vec<Snapshot> {
        self.0
            .borrow()
            .iter()
            .filter(|s| s.label == label)
            .cloned()
            .collect()
    }

    fn last(&self, label: &str) -> Snapshot {
        self.of(label).pop().expect("view never rendered")
    }
}

/// Lets the test trigger a mounted hook's refetch
#[derive(Clone, Default)]
struct RefetchHandle(Rc<RefCell<Option<Box<dyn Fn()>>>>);

#[derive(Clone)]
struct Visible(Rc<Cell<bool>>);

fn names(clinics: Vec<Clinic>) -> Vec<String> {
    clinics.into_iter().map(|c| c.name).collect()
}

#[component]
fn AllClinicsView(label: &'static str) -> Element {
    let clinics = use_all_clinics();
    use_context::<Renders>().record(
        label,
        clinics.is_loading(),
        clinics.data().map(names),
        clinics.error(),
    );
    rsx! {}
}

#[component]
fn AllProductsView() -> Element {
    let products = use_all_products();
    use_context::<Renders>().record(
        "products",
        products.is_loading(),
        products
            .data()
            .map(|products| products.into_iter().map(|p| p.name).collect()),
        products.error(),
    );
    rsx! {}
}

#[component]
fn RefetchingClinicsView() -> Element {
    let clinics = use_all_clinics();
    let handle = use_context::<RefetchHandle>();
    use_hook(|| {
        let clinics = clinics.clone();
        *handle.0.borrow_mut() = Some(Box::new(move || {
            clinics.refetch();
        }));
    });
    use_context::<Renders>().record(
        "refetching",
        clinics.is_loading(),
        clinics.data().map(names),
        clinics.error(),
    );
    rsx! {}
}

fn catalog_screen() -> Element {
    rsx! {
        AllClinicsView { label: "first" }
        AllClinicsView { label: "second" }
        AllProductsView {}
    }
}

fn refetch_screen() -> Element {
    rsx! {
        RefetchingClinicsView {}
    }
}

fn toggle_screen() -> Element {
    let show = use_context::<Visible>().0.get();
    rsx! {
        if show {
            AllClinicsView { label: "toggled" }
        }
    }
}

static NUMBER_CALLS: AtomicUsize = AtomicUsize::new(0);
static TEXT_CALLS: AtomicUsize = AtomicUsize::new(0);

#[component]
fn NumberView() -> Element {
    let number = use_query(NamedQuery::new("shared", || async {
        NUMBER_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok::<u32, FetchError>(7)
    }));
    use_context::<Renders>().record(
        "number",
        number.is_loading(),
        number.data().map(|n| vec![n.to_string()]),
        number.error(),
    );
    rsx! {}
}

#[component]
fn TextView() -> Element {
    let text = use_query(NamedQuery::new("shared", || async {
        TEXT_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok::<String, FetchError>("seven".to_string())
    }));
    use_context::<Renders>().record(
        "text",
        text.is_loading(),
        text.data().map(|t| vec![t]),
        text.error(),
    );
    rsx! {}
}

fn colliding_screen() -> Element {
    rsx! {
        NumberView {}
        TextView {}
    }
}

struct Harness {
    client: QueryClient,
    service: Arc<CountingCatalog>,
    renders: Renders,
    refetch: RefetchHandle,
    visible: Visible,
}

impl Harness {
    fn new(clinics: Vec<Clinic>) -> Self {
        init_tracing();
        Self {
            client: QueryClient::new(),
            service: Arc::new(CountingCatalog::new(clinics)),
            renders: Renders::default(),
            refetch: RefetchHandle::default(),
            visible: Visible(Rc::new(Cell::new(true))),
        }
    }

    fn mount(&self, root: fn() -> Element) -> VirtualDom {
        let catalog = Catalog::from(self.service.clone() as Arc<dyn CatalogService>);
        let mut dom = VirtualDom::new(root)
            .with_root_context(self.client.clone())
            .with_root_context(catalog)
            .with_root_context(self.renders.clone())
            .with_root_context(self.refetch.clone())
            .with_root_context(self.visible.clone());
        dom.rebuild_in_place();
        dom
    }
}

/// Poll tasks and re-render until nothing happens for `duration`
async fn run_for(dom: &mut VirtualDom, duration: Duration) {
    let deadline = tokio::time::Instant::now() + duration;
    while tokio::time::timeout_at(deadline, dom.wait_for_work())
        .await
        .is_ok()
    {
        dom.render_immediate(&mut NoOpMutations);
    }
}

#[tokio::test]
async fn test_sibling_hooks_share_one_fetch() {
    let harness = Harness::new(vec![clinic(1, "Clinic A")]);
    let mut dom = harness.mount(catalog_screen);

    for label in ["first", "second", "products"] {
        let initial = harness.renders.of(label).remove(0);
        assert!(initial.loading);
        assert_eq!(initial.data, None);
        assert_eq!(initial.error, None);
    }

    run_for(&mut dom, Duration::from_millis(100)).await;

    for label in ["first", "second"] {
        let settled = harness.renders.last(label);
        assert!(!settled.loading);
        assert_eq!(settled.data, Some(vec!["Clinic A".to_string()]));
        assert_eq!(settled.error, None);
    }
    assert_eq!(harness.service.clinic_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejection_reaches_the_hook_unchanged() {
    let harness = Harness::new(Vec::new());
    let mut dom = harness.mount(catalog_screen);
    run_for(&mut dom, Duration::from_millis(100)).await;

    let products = harness.renders.last("products");
    assert!(!products.loading);
    assert_eq!(products.data, None);
    assert_eq!(products.error.as_deref(), Some("network error"));
    // No retry
    assert_eq!(harness.service.product_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hook_refetch_and_cache_clear() {
    let harness = Harness::new(vec![clinic(1, "Clinic A")]);
    let mut dom = harness.mount(refetch_screen);
    run_for(&mut dom, Duration::from_millis(100)).await;
    assert_eq!(
        harness.renders.last("refetching").data,
        Some(vec!["Clinic A".to_string()])
    );

    harness
        .service
        .set_clinics(vec![clinic(1, "Clinic A"), clinic(2, "Clinic B")]);
    let before_refetch = harness.renders.len();
    {
        let refetch = harness.refetch.0.borrow();
        let refetch = refetch.as_ref().expect("view registered its refetch");
        dom.in_scope(ScopeId::ROOT, || refetch());
    }
    run_for(&mut dom, Duration::from_millis(100)).await;

    assert_eq!(
        harness.renders.last("refetching").data,
        Some(vec!["Clinic A".to_string(), "Clinic B".to_string()])
    );
    assert_eq!(harness.service.clinic_calls.load(Ordering::SeqCst), 2);
    // The old data stays visible while the refetch runs
    assert!(harness.renders.0.borrow()[before_refetch..]
        .iter()
        .all(|s| !s.loading));

    harness.service.set_clinics(vec![clinic(3, "Clinic C")]);
    harness.client.clear();
    run_for(&mut dom, Duration::from_millis(100)).await;

    assert_eq!(
        harness.renders.last("refetching").data,
        Some(vec!["Clinic C".to_string()])
    );
    assert_eq!(harness.service.clinic_calls.load(Ordering::SeqCst), 3);
    assert!(harness.client.cache().contains("all-clinics"));
}

#[tokio::test]
async fn test_unmount_stops_observing() {
    let harness = Harness::new(vec![clinic(1, "Clinic A")]);
    let mut dom = harness.mount(toggle_screen);
    run_for(&mut dom, Duration::from_millis(100)).await;
    assert_eq!(harness.client.stats().total_observers, 1);

    harness.visible.0.set(false);
    dom.mark_dirty(ScopeId::ROOT);
    dom.render_immediate(&mut NoOpMutations);

    let stats = harness.client.stats();
    assert_eq!(stats.total_observers, 0);
    // The data outlives the component
    assert_eq!(stats.with_data_count, 1);
}

#[tokio::test]
async fn test_key_taken_over_by_another_type_does_not_loop() {
    let harness = Harness::new(Vec::new());
    let mut dom = harness.mount(colliding_screen);
    run_for(&mut dom, Duration::from_millis(100)).await;

    assert_eq!(NUMBER_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(TEXT_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(harness.renders.last("number").data, Some(vec!["7".to_string()]));
    assert_eq!(harness.renders.last("text").data, Some(vec!["seven".to_string()]));
    assert!(
        harness
            .client
            .cache()
            .get::<String, FetchError>("shared")
            .is_some()
    );
}
