use log::{debug, warn};
use std::collections::HashMap;
use thiserror::Error;

use crate::filter::{filter_documents, Document, FilterOptions};
use crate::provider::{OptionChoice, OptionProvider, ProviderError, UpstreamIds};
use crate::selection::{Dimension, Selection, SelectionError, SelectionStore, DIMENSIONS};

/// The current option set of one dropdown. A disabled set renders as an
/// empty, non-interactive control; the rest of the chain stays usable.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    pub choices: Vec<OptionChoice>,
    pub enabled: bool,
}

impl OptionSet {
    fn disabled() -> Self {
        OptionSet::default()
    }
}

/// Identity of an issued option fetch: the target dimension, the generation
/// of that dimension at issue time, and the upstream ids it was
/// parameterized by. A completion is applied only while the generation still
/// matches; otherwise the response is stale and silently discarded.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    dimension: Dimension,
    generation: u64,
    upstream: UpstreamIds,
}

impl FetchTicket {
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn upstream(&self) -> &UpstreamIds {
        &self.upstream
    }
}

/// What became of a completed refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The option set was replaced.
    Applied,
    /// The response was issued for a superseded selection and was ignored.
    Stale,
    /// Upstream prerequisites are unmet; the dimension stays disabled and
    /// nothing was fetched.
    Skipped,
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// A provider call failed. Retriable: the affected dimension is left
    /// empty and disabled, everything else keeps working.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Page controller for the cascading filter form.
///
/// Owns the selection store, the per-dimension option sets, the loaded
/// document collection and the Option Provider. All selection mutation goes
/// through [`FilterController::on_selection_change`]; nothing else writes
/// the store.
pub struct FilterController<P> {
    store: SelectionStore,
    provider: P,
    documents: Vec<Document>,
    options: [OptionSet; 4],
    generations: [u64; 4],
    cache: HashMap<(Dimension, UpstreamIds), Vec<OptionChoice>>,
    filter_options: FilterOptions,
}

impl<P: OptionProvider> FilterController<P> {
    pub fn new(provider: P) -> Self {
        FilterController {
            store: SelectionStore::new(),
            provider,
            documents: Vec::new(),
            options: std::array::from_fn(|_| OptionSet::disabled()),
            generations: [0; 4],
            cache: HashMap::new(),
            filter_options: FilterOptions::default(),
        }
    }

    pub fn with_filter_options(mut self, filter_options: FilterOptions) -> Self {
        self.filter_options = filter_options;
        self
    }

    /// Page-load setup: fetch the document collection and populate the
    /// scheme options. Downstream dimensions start disabled.
    pub async fn initialize(&mut self) -> Result<(), CascadeError> {
        self.documents = self.provider.fetch_documents().await?;
        self.refresh_options(Dimension::Scheme).await?;
        Ok(())
    }

    /// Replace the document collection directly (e.g. from a prior fetch).
    pub fn set_documents(&mut self, documents: Vec<Document>) {
        self.documents = documents;
    }

    /// UI entry point for a dropdown selection.
    ///
    /// Synchronously applies the new value and resets every downstream
    /// dimension, then repopulates the dependent option set(s). A scheme
    /// selection repopulates both branch and semester (both depend only on
    /// the scheme); otherwise only the next dimension in the chain is
    /// refreshed, and only once its own prerequisites are resolved.
    ///
    /// Selecting `"All"` skips the fetches entirely: dependents are reset
    /// and disabled.
    ///
    /// # Errors
    /// `CascadeError::Selection` for a rejected set (no state change);
    /// `CascadeError::Provider` when a fetch fails (the dependent dimension
    /// is left disabled; retrying the same selection is safe).
    pub async fn on_selection_change(
        &mut self,
        dimension: Dimension,
        value: &str,
        id: Option<&str>,
    ) -> Result<(), CascadeError> {
        self.store.set(dimension, value, id)?;
        for &d in dimension.downstream() {
            self.generations[d.index()] += 1;
            self.options[d.index()] = OptionSet::disabled();
        }

        if self.store.get(dimension).is_all() {
            return Ok(());
        }

        match dimension {
            Dimension::Scheme => {
                // Refresh both dependents even when one fails, so a branch
                // fetch error never leaves semester disabled too.
                let branch = self.refresh_options(Dimension::Branch).await;
                let semester = self.refresh_options(Dimension::Semester).await;
                branch?;
                semester?;
            }
            _ => {
                if let Some(next) = dimension.next() {
                    self.refresh_options(next).await?;
                }
            }
        }
        Ok(())
    }

    /// Clear every filter. Scheme options survive; dependent option sets go
    /// back to disabled until a new scheme is chosen.
    pub fn clear_filters(&mut self) {
        self.store.reset_all();
        for &d in Dimension::Scheme.downstream() {
            self.generations[d.index()] += 1;
            self.options[d.index()] = OptionSet::disabled();
        }
    }

    /// The currently filtered document collection, in original order.
    pub fn visible_documents(&self) -> Vec<&Document> {
        filter_documents(&self.store, &self.documents, self.filter_options)
    }

    /// The four current `{value, id}` pairs for badge/summary rendering.
    pub fn selection_summary(&self) -> Vec<(Dimension, Selection)> {
        self.store.summary()
    }

    /// Number of dimensions currently constraining the results.
    pub fn active_filter_count(&self) -> usize {
        self.store.active_dimensions().len()
    }

    pub fn options(&self, dimension: Dimension) -> &OptionSet {
        &self.options[dimension.index()]
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Stamp an option fetch for `dimension` against the current selection
    /// context. Returns `None` when the dimension's prerequisites are not
    /// yet resolved; it then stays empty and disabled rather than being
    /// fetched speculatively.
    pub fn begin_refresh(&self, dimension: Dimension) -> Option<FetchTicket> {
        let upstream = self.upstream_ids(dimension)?;
        Some(FetchTicket {
            dimension,
            generation: self.generations[dimension.index()],
            upstream,
        })
    }

    /// Apply (or discard) the result of a fetch issued via `begin_refresh`.
    ///
    /// A response whose ticket generation no longer matches the dimension's
    /// current generation was issued for a superseded selection and is
    /// dropped without touching the option set. A fresh failure disables the
    /// dimension and surfaces the error as retriable.
    pub fn complete_refresh(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<OptionChoice>, ProviderError>,
    ) -> Result<RefreshOutcome, CascadeError> {
        let idx = ticket.dimension.index();
        if self.generations[idx] != ticket.generation {
            debug!(
                "discarding stale {} options for upstream {:?}",
                ticket.dimension, ticket.upstream
            );
            return Ok(RefreshOutcome::Stale);
        }

        match result {
            Ok(choices) => {
                self.cache
                    .entry((ticket.dimension, ticket.upstream.clone()))
                    .or_insert_with(|| choices.clone());
                let mut full = Vec::with_capacity(choices.len() + 1);
                full.push(OptionChoice::all(ticket.dimension));
                full.extend(choices);
                self.options[idx] = OptionSet {
                    choices: full,
                    enabled: true,
                };
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => {
                warn!("failed to load {} options: {e}", ticket.dimension);
                self.options[idx] = OptionSet::disabled();
                Err(e.into())
            }
        }
    }

    /// Issue-and-complete convenience used by the synchronous-looking UI
    /// path. Memoized by `(dimension, upstream ids)`; cache entries live for
    /// the controller's lifetime.
    pub async fn refresh_options(
        &mut self,
        dimension: Dimension,
    ) -> Result<RefreshOutcome, CascadeError> {
        let Some(ticket) = self.begin_refresh(dimension) else {
            return Ok(RefreshOutcome::Skipped);
        };

        let key = (dimension, ticket.upstream.clone());
        let result = match self.cache.get(&key) {
            Some(cached) => Ok(cached.clone()),
            None => self.provider.fetch_options(dimension, &ticket.upstream).await,
        };
        self.complete_refresh(ticket, result)
    }

    /// The resolved upstream ids a fetch for `dimension` is parameterized
    /// by, or `None` while a required upstream id is still unresolved.
    fn upstream_ids(&self, dimension: Dimension) -> Option<UpstreamIds> {
        let scheme = self.store.get(Dimension::Scheme).id.clone();
        let branch = self.store.get(Dimension::Branch).id.clone();
        let semester = self.store.get(Dimension::Semester).id.clone();

        match dimension {
            Dimension::Scheme => Some(UpstreamIds::default()),
            // Branch and semester options are only meaningful once a scheme
            // is chosen, even though the fetch itself takes no parameters.
            Dimension::Branch | Dimension::Semester => {
                scheme.as_ref()?;
                Some(UpstreamIds {
                    scheme,
                    ..UpstreamIds::default()
                })
            }
            Dimension::Subject => {
                branch.as_ref()?;
                semester.as_ref()?;
                Some(UpstreamIds {
                    scheme,
                    branch,
                    semester,
                })
            }
        }
    }
}
