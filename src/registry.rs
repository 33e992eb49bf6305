//! The view/partial template collection and its render entry points.
//!
//! This module provides [`Templates`], which owns every compiled view, the
//! shared partial sources, the function table, and the buffer pool renders
//! draw from.
//!
//! # Design
//!
//! Views and partials live in disjoint namespaces. Each view compiles into
//! its own engine environment; partials are raw sources that get attached to
//! every view environment as named sub-templates. A per-view attachment set
//! records which (view, partial-name) pairs have already been attached, and
//! a synchronization pass runs after every mutation:
//!
//! 1. [`add_view`](Templates::add_view) compiles the source with the current
//!    function table, resets the view's attachment set, and synchronizes.
//! 2. [`add_partial`](Templates::add_partial) validates and stores the
//!    source, then synchronizes.
//! 3. The pass attaches every stored partial to every view that does not
//!    have a partial of that name yet, and marks the pair.
//!
//! The pass is idempotent and never re-attaches a marked pair, so total work
//! is proportional to newly introduced pairs rather than views × partials on
//! every call. It also gives the attachment its first-write-wins semantics:
//! re-registering a partial under an existing name changes what *future*
//! views (or re-added views) see, never what an existing view already
//! attached.
//!
//! # Rendering
//!
//! [`render_to_bytes`](Templates::render_to_bytes) looks the view up,
//! borrows a pooled buffer, executes the entry template into it, and copies
//! the bytes out; the buffer returns to the pool on every exit path.
//! [`render_to_writer`](Templates::render_to_writer) streams into a
//! caller-supplied writer with no intermediate buffering, which also means a
//! mid-render failure leaves whatever was already written in place.
//!
//! The optional base name selects the entry template: `None` (or the view's
//! own name) executes the view directly; any other name executes that named
//! sub-template from the view's environment, which is how a shared layout
//! wraps a page.
//!
//! # Concurrency
//!
//! All render methods take `&self` and `Templates` is `Send + Sync`, so any
//! number of renders may run in parallel against one shared collection.
//! Mutation takes `&mut self`; with an `Arc<Templates>` the borrow rules
//! enforce the load-then-serve discipline at compile time, and deployments
//! that really need live mutation wrap the collection in an `RwLock`.

use std::collections::{HashMap, HashSet};
use std::io;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult};
use minijinja::{Environment, Value};
use serde::Serialize;

use crate::error::RenderError;
use crate::pool::BufferPool;

/// A collection of view templates sharing a set of partials.
///
/// Created empty, populated by [`add_view`](Self::add_view) /
/// [`add_partial`](Self::add_partial) / [`add_func`](Self::add_func) calls
/// or one [`parse_directory`](Self::parse_directory) scan, then rendered
/// from concurrently. Further additions are allowed at any time (through
/// `&mut`) and take effect for future renders.
///
/// There is no implicit global collection; construct one and pass it where
/// it is needed.
///
/// # Example
///
/// ```
/// use serde::Serialize;
/// use viewset::Templates;
///
/// #[derive(Serialize)]
/// struct Page {
///     title: String,
///     menu: String,
/// }
///
/// # fn main() -> Result<(), viewset::RenderError> {
/// let mut templates = Templates::new();
/// templates.add_partial("nav", "<nav>{{ menu }}</nav>")?;
/// templates.add_view(
///     "index",
///     r#"<html>{% include "nav" %}<p>{{ title }}</p></html>"#,
/// )?;
///
/// let page = Page { title: "Hi".into(), menu: "M".into() };
/// let html = templates.render_to_bytes(None, "index", &page)?;
/// assert_eq!(html, b"<html><nav>M</nav><p>Hi</p></html>");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Templates {
    /// One compiled environment per view, keyed by view name.
    views: HashMap<String, Environment<'static>>,
    /// Raw partial sources, keyed by partial name.
    partials: HashMap<String, String>,
    /// Function table snapshot applied to each view at compile time.
    funcs: HashMap<String, Value>,
    /// Attachment tracking: view name → names of partials already attached.
    attached: HashMap<String, HashSet<String>>,
    /// Extension allow-list for directory scans (empty = allow everything).
    pub(crate) extensions: Vec<String>,
    pool: BufferPool,
}

impl Templates {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `source` as a view and gives it access to every partial.
    ///
    /// The view is compiled against the current function table; functions
    /// registered later are not visible to it. Registering an existing name
    /// replaces the previous view and re-attaches all partials at their
    /// current content, which is the explicit repair path for picking up a
    /// partial that was re-registered after this view first compiled.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Parse`] if the source is malformed; the
    /// collection is left unchanged.
    pub fn add_view(&mut self, name: impl Into<String>, source: &str) -> Result<(), RenderError> {
        let name = name.into();
        let mut env = Environment::new();
        for (func_name, func) in &self.funcs {
            env.add_global(func_name.clone(), func.clone());
        }
        env.add_template_owned(name.clone(), source.to_string())
            .map_err(|e| RenderError::parse(&name, e))?;

        self.views.insert(name.clone(), env);
        self.attached.insert(name, HashSet::new());
        self.attach_partials()
    }

    /// Stores `source` as a partial available to every view.
    ///
    /// Overwrites any existing partial source under the same name, but does
    /// not replace the partial inside views that already attached it; only
    /// views added (or re-added) afterwards see the new content.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Parse`] if the source is malformed. The
    /// partial is rejected before any view attaches it, so existing entries
    /// are unaffected.
    pub fn add_partial(
        &mut self,
        name: impl Into<String>,
        source: &str,
    ) -> Result<(), RenderError> {
        let name = name.into();

        // Parse-check in a scratch environment so a malformed partial is
        // rejected whole, never half-attached across views.
        let mut scratch = Environment::new();
        scratch
            .add_template_owned(name.clone(), source.to_string())
            .map_err(|e| RenderError::parse(&name, e))?;

        self.partials.insert(name, source.to_string());
        self.attach_partials()
    }

    /// Registers a callable under `name` for use inside template source.
    ///
    /// Must be called before any view that references it is compiled;
    /// calling it late is not an error, but views compiled earlier will not
    /// see the function and fail at render time if their source calls it.
    ///
    /// Accepts the same callables as the engine itself:
    ///
    /// ```
    /// # let mut templates = viewset::Templates::new();
    /// templates.add_func("shout", |s: String| s.to_uppercase());
    /// ```
    pub fn add_func<F, Rv, Args>(&mut self, name: impl Into<String>, f: F)
    where
        F: Function<Rv, Args> + for<'a> Function<Rv, <Args as FunctionArgs<'a>>::Output>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.funcs.insert(name.into(), Value::from_function::<F, Rv, Args>(f));
    }

    /// Attaches every stored partial to every view missing it.
    ///
    /// Runs after each mutation. Pairs already marked in the attachment set
    /// are skipped, so repeated calls do no redundant compilation.
    fn attach_partials(&mut self) -> Result<(), RenderError> {
        for (view_name, env) in self.views.iter_mut() {
            let attached = self.attached.entry(view_name.clone()).or_default();
            for (partial_name, source) in &self.partials {
                if attached.contains(partial_name) {
                    continue;
                }
                env.add_template_owned(partial_name.clone(), source.clone())
                    .map_err(|e| RenderError::parse(partial_name, e))?;
                attached.insert(partial_name.clone());
            }
        }
        Ok(())
    }

    /// Returns true if a view is registered under `name`.
    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    /// Returns an iterator over registered view names.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(|s| s.as_str())
    }

    /// Returns an iterator over registered partial names.
    pub fn partial_names(&self) -> impl Iterator<Item = &str> {
        self.partials.keys().map(|s| s.as_str())
    }

    /// Returns the number of registered views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns true if no views are registered.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Renders a view into a fresh byte vector.
    ///
    /// With `base: None` (or a base equal to the view's own name) the view
    /// template itself is executed. Any other base name executes that named
    /// sub-template from the view's environment: the base + view composite
    /// pattern, where a shared layout pulls the page in.
    ///
    /// The render goes through a pooled buffer that is returned to the pool
    /// before this method returns, on success and failure alike.
    ///
    /// # Errors
    ///
    /// [`RenderError::ViewNotFound`] if `view` was never registered;
    /// [`RenderError::Execution`] if the entry template is missing from the
    /// view's environment or the engine fails mid-render;
    /// [`RenderError::Serialization`] if `data` cannot be serialized.
    pub fn render_to_bytes<S: Serialize>(
        &self,
        base: Option<&str>,
        view: &str,
        data: &S,
    ) -> Result<Vec<u8>, RenderError> {
        let env = self.environment(view)?;
        let entry = entry_name(base, view);
        let value = to_value(data)?;

        let mut buf = self.pool.acquire();
        let tmpl = env
            .get_template(entry)
            .map_err(|e| RenderError::execution(entry, e))?;
        tmpl.render_to_write(value, &mut *buf)
            .map_err(|e| RenderError::execution(entry, e))?;
        Ok(buf.to_vec())
    }

    /// Renders a view incrementally into a caller-supplied writer.
    ///
    /// Same execution as [`render_to_bytes`](Self::render_to_bytes), but
    /// output goes straight to `writer` with no intermediate buffering. On
    /// failure, bytes already written stay written; treat the sink's
    /// contents as undefined after an error.
    pub fn render_to_writer<S: Serialize, W: io::Write>(
        &self,
        writer: W,
        base: Option<&str>,
        view: &str,
        data: &S,
    ) -> Result<(), RenderError> {
        let env = self.environment(view)?;
        let entry = entry_name(base, view);
        let value = to_value(data)?;

        let tmpl = env
            .get_template(entry)
            .map_err(|e| RenderError::execution(entry, e))?;
        tmpl.render_to_write(value, writer)
            .map_err(|e| RenderError::execution(entry, e))?;
        Ok(())
    }

    /// Like [`render_to_bytes`](Self::render_to_bytes), but panics on error.
    ///
    /// # Panics
    ///
    /// Panics on any render failure. Only use this where halting on a bad
    /// render is acceptable, or where the caller catches unwinds.
    pub fn must_render_to_bytes<S: Serialize>(
        &self,
        base: Option<&str>,
        view: &str,
        data: &S,
    ) -> Vec<u8> {
        match self.render_to_bytes(base, view, data) {
            Ok(bytes) => bytes,
            Err(err) => panic!("rendering view \"{view}\" failed: {err}"),
        }
    }

    /// Like [`render_to_writer`](Self::render_to_writer), but panics on error.
    ///
    /// # Panics
    ///
    /// Panics on any render failure; see
    /// [`must_render_to_bytes`](Self::must_render_to_bytes).
    pub fn must_render_to_writer<S: Serialize, W: io::Write>(
        &self,
        writer: W,
        base: Option<&str>,
        view: &str,
        data: &S,
    ) {
        if let Err(err) = self.render_to_writer(writer, base, view, data) {
            panic!("rendering view \"{view}\" failed: {err}");
        }
    }

    fn environment(&self, view: &str) -> Result<&Environment<'static>, RenderError> {
        self.views
            .get(view)
            .ok_or_else(|| RenderError::ViewNotFound(view.to_string()))
    }
}

/// Picks the entry template: the base when one is named, else the view.
fn entry_name<'a>(base: Option<&'a str>, view: &'a str) -> &'a str {
    match base {
        Some(base) if !base.is_empty() && base != view => base,
        _ => view,
    }
}

fn to_value<S: Serialize>(data: &S) -> Result<Value, RenderError> {
    let json = serde_json::to_value(data)?;
    Ok(Value::from_serialize(&json))
}
