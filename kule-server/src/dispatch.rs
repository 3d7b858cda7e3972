//! The route table: which view answers each verb on each path.
//!
//! [`Resources`] collects generic views keyed by `(verb, cardinality)`, override views
//! keyed by `(verb, collection, cardinality)`, and per-collection bundlers. It is turned
//! into an immutable [`Router`] exactly once by [`Resources::into_router`].
//!
//! The generic paths `/{collection}` and `/{collection}/{id}` always exist for every
//! verb, answering with the generic view or with 501 when there is none. Each declared
//! collection that has at least one override also gets the literal paths
//! `/<collection>` and `/<collection>/{id}`. A literal path segment outranks a capture
//! in the router, so overrides win for their collection and the remaining verbs on the
//! literal path fall back to the generic views.
//!
//! Declared collections are the gateway's whitelist. Without a whitelist every
//! collection with an override is declared. Overrides for collections outside a
//! non-empty whitelist are never routed.
//!
//! # Example
//!
//! ```ignore
//! use kule_server::{dispatch::Resources, resource::{Cardinality, Verb}};
//!
//! let router = Resources::new()
//!     .view(Verb::Get, "widgets", Cardinality::List, list_widgets)
//!     .bundler("widgets", bundle_widget)
//!     .into_router(gateway);
//! ```

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

use axum::{
    Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{BytesRejection, PathRejection, QueryRejection},
    },
    routing::MethodRouter,
};
use http::{HeaderValue, Method, Uri, header::CONTENT_TYPE};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use kule_core::store::StoreGateway;

use crate::{
    bundle::{Bundler, BundlerRegistry},
    error::ApiError,
    resource::{Cardinality, ResourceRequest, Verb, View, ViewContext},
    views,
};

// Extractors are taken as `Result`s so their rejections render as `ApiError`.
type Params = Result<Query<HashMap<String, String>>, QueryRejection>;
type Payload = Result<Bytes, BytesRejection>;
type Captured<T> = Result<Path<T>, PathRejection>;

/// Where the view answering a route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSource {
    Override,
    Generic,
    NotImplemented,
}

/// One entry of the route table.
#[derive(Clone)]
pub struct Route {
    pub path: String,
    pub verb: Verb,
    pub cardinality: Cardinality,
    /// The literal collection of an override path, `None` on generic paths.
    pub collection: Option<String>,
    pub source: ViewSource,
    view: Arc<dyn View>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("verb", &self.verb)
            .field("cardinality", &self.cardinality)
            .field("collection", &self.collection)
            .field("source", &self.source)
            .finish()
    }
}

/// Views and bundlers to be routed.
#[derive(Clone)]
pub struct Resources {
    generic: HashMap<(Verb, Cardinality), Arc<dyn View>>,
    overrides: BTreeMap<(String, Cardinality, Verb), Arc<dyn View>>,
    bundlers: BundlerRegistry,
}

impl Resources {
    /// Creates resources answering with the generic CRUD views.
    pub fn new() -> Self {
        Self::empty()
            .generic_view(Verb::Get, Cardinality::List, views::get_list)
            .generic_view(Verb::Post, Cardinality::List, views::post_list)
            .generic_view(Verb::Get, Cardinality::Detail, views::get_detail)
            .generic_view(Verb::Put, Cardinality::Detail, views::put_detail)
            .generic_view(Verb::Patch, Cardinality::Detail, views::patch_detail)
            .generic_view(Verb::Delete, Cardinality::Detail, views::delete_detail)
    }

    /// Creates resources with no views at all; every route answers 501.
    pub fn empty() -> Self {
        Self {
            generic: HashMap::new(),
            overrides: BTreeMap::new(),
            bundlers: BundlerRegistry::new(),
        }
    }

    /// Sets the generic view for a verb and cardinality.
    pub fn generic_view<V: View + 'static>(mut self, verb: Verb, cardinality: Cardinality, view: V) -> Self {
        self.generic.insert((verb, cardinality), Arc::new(view));
        self
    }

    /// Overrides the view for a verb and cardinality of one collection.
    pub fn view<V: View + 'static>(
        mut self,
        verb: Verb,
        collection: impl Into<String>,
        cardinality: Cardinality,
        view: V,
    ) -> Self {
        self.overrides.insert((collection.into(), cardinality, verb), Arc::new(view));
        self
    }

    /// Sets the bundler applied to documents of `collection`.
    pub fn bundler<B: Bundler + 'static>(mut self, collection: impl Into<String>, bundler: B) -> Self {
        self.bundlers.register(collection, bundler);
        self
    }

    /// Collections with at least one override, in sorted order.
    pub fn overridden_collections(&self) -> BTreeSet<&str> {
        self.overrides
            .keys()
            .map(|(collection, _, _)| collection.as_str())
            .collect()
    }

    /// Builds the route table for the given gateway's whitelist.
    pub fn routes(&self, gateway: &StoreGateway) -> Vec<Route> {
        let mut routes = Vec::new();

        for cardinality in [Cardinality::List, Cardinality::Detail] {
            for verb in Verb::ALL {
                routes.push(self.fallback_route(generic_path(cardinality), verb, cardinality, None));
            }
        }

        for collection in self.declared_collections(gateway) {
            for cardinality in [Cardinality::List, Cardinality::Detail] {
                if !self.has_override(&collection, cardinality) {
                    continue;
                }

                let path = literal_path(&collection, cardinality);
                for verb in Verb::ALL {
                    let key = (collection.clone(), cardinality, verb);
                    routes.push(match self.overrides.get(&key) {
                        Some(view) => Route {
                            path: path.clone(),
                            verb,
                            cardinality,
                            collection: Some(collection.clone()),
                            source: ViewSource::Override,
                            view: view.clone(),
                        },
                        None => self.fallback_route(path.clone(), verb, cardinality, Some(collection.clone())),
                    });
                }
            }
        }

        routes
    }

    /// Builds the router over `gateway`. The route table is fixed from here on.
    pub fn into_router(self, gateway: impl Into<Arc<StoreGateway>>) -> Router {
        let gateway = gateway.into();
        let routes = self.routes(&gateway);
        let ctx = ViewContext::new(gateway, Arc::new(self.bundlers));

        let mut paths: BTreeMap<String, MethodRouter<ViewContext>> = BTreeMap::new();
        for route in routes {
            if route.source == ViewSource::Override {
                tracing::debug!(
                    verb = %route.verb,
                    path = %route.path,
                    "registered override view"
                );
            }

            let methods = paths.remove(&route.path).unwrap_or_else(MethodRouter::new);
            paths.insert(route.path.clone(), endpoint(methods, route));
        }

        let mut router = Router::new();
        for (path, methods) in paths {
            router = router.route(&path, methods.fallback(method_not_allowed));
        }

        router
            .fallback(not_found)
            .with_state(ctx)
            .layer(SetResponseHeaderLayer::overriding(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ))
            .layer(TraceLayer::new_for_http())
    }

    fn declared_collections(&self, gateway: &StoreGateway) -> Vec<String> {
        let whitelist: Vec<String> = gateway.whitelist().map(str::to_string).collect();
        let overridden = self.overridden_collections();

        if whitelist.is_empty() {
            return overridden.into_iter().map(str::to_string).collect();
        }

        for collection in overridden.iter().filter(|c| !gateway.is_permitted(c)) {
            tracing::warn!(collection = %collection, "override ignored for a collection outside the whitelist");
        }

        whitelist
    }

    fn has_override(&self, collection: &str, cardinality: Cardinality) -> bool {
        Verb::ALL
            .iter()
            .any(|verb| self.overrides.contains_key(&(collection.to_string(), cardinality, *verb)))
    }

    fn fallback_route(&self, path: String, verb: Verb, cardinality: Cardinality, collection: Option<String>) -> Route {
        let (source, view) = match self.generic.get(&(verb, cardinality)) {
            Some(view) => (ViewSource::Generic, view.clone()),
            None => (ViewSource::NotImplemented, Arc::new(views::not_implemented) as Arc<dyn View>),
        };

        Route { path, verb, cardinality, collection, source, view }
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut generic: Vec<_> = self.generic.keys().collect();
        generic.sort();

        f.debug_struct("Resources")
            .field("generic", &generic)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("bundlers", &self.bundlers)
            .finish()
    }
}

fn generic_path(cardinality: Cardinality) -> String {
    match cardinality {
        Cardinality::List => "/{collection}".to_string(),
        Cardinality::Detail => "/{collection}/{id}".to_string(),
    }
}

fn literal_path(collection: &str, cardinality: Cardinality) -> String {
    match cardinality {
        Cardinality::List => format!("/{collection}"),
        Cardinality::Detail => format!("/{collection}/{{id}}"),
    }
}

/// Adds the handler for `route` to `methods`.
///
/// The extractors depend on the path shape: generic paths capture the collection,
/// literal paths only capture the id, if any.
fn endpoint(methods: MethodRouter<ViewContext>, route: Route) -> MethodRouter<ViewContext> {
    let filter = route.verb.method_filter();
    let view = route.view;

    match (route.collection, route.cardinality) {
        (None, Cardinality::List) => methods.on(
            filter,
            move |State(ctx): State<ViewContext>, path: Captured<String>, params: Params, body: Payload| async move {
                let Path(collection) = path?;
                let request = ResourceRequest::new(collection)
                    .with_params(params?.0)
                    .with_body(body?);
                view.call(ctx, request).await
            },
        ),
        (None, Cardinality::Detail) => methods.on(
            filter,
            move |State(ctx): State<ViewContext>, path: Captured<(String, String)>, params: Params, body: Payload| async move {
                let Path((collection, pk)) = path?;
                let request = ResourceRequest::new(collection)
                    .with_pk(pk)
                    .with_params(params?.0)
                    .with_body(body?);
                view.call(ctx, request).await
            },
        ),
        (Some(collection), Cardinality::List) => methods.on(
            filter,
            move |State(ctx): State<ViewContext>, params: Params, body: Payload| async move {
                let request = ResourceRequest::new(collection)
                    .with_params(params?.0)
                    .with_body(body?);
                view.call(ctx, request).await
            },
        ),
        (Some(collection), Cardinality::Detail) => methods.on(
            filter,
            move |State(ctx): State<ViewContext>, path: Captured<String>, params: Params, body: Payload| async move {
                let Path(pk) = path?;
                let request = ResourceRequest::new(collection)
                    .with_pk(pk)
                    .with_params(params?.0)
                    .with_body(body?);
                view.call(ctx, request).await
            },
        ),
    }
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed(format!("{method} {uri}"))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {uri}"))
}
