/*!
# Stucon Student Document Portal

A web portal where students browse and share course documents, built in
Rust.

## Overview

The portal serves its pages (login, signup, a filterable document browser
and an upload form) backed by a small REST API. The interesting part is the
cascading filter: four dropdowns (`scheme → branch → semester → subject`)
forming a strict dependency chain, where choosing an upstream value resets
everything downstream and repopulates the next dropdown's options from the
backend.

## Architecture

### Filter core (no DOM, no HTTP)
- **selection**: the Selection Store, per-dimension `{value, id}` state
  with the `"All"` sentinel and the chain-reset invariant
- **cascade**: the Dependency Resolver, with option-set bookkeeping,
  generation-tagged fetches that discard stale responses, and the memoized
  `FilterController` driving it all
- **filter**: the document model and the stable filter predicate

### Collaborators
- **provider**: the `OptionProvider` seam plus a reqwest client for a
  remote backend
- **catalog**: scheme/branch/subject/document data with JSON persistence
  and an in-process provider

### Web layer
- **auth**: signup/login/logout/validate with argon2 hashing and cookie
  sessions
- **app**: axum routing, the explore/documents/upload endpoints and the
  embedded pages
- **error**: HTTP error mapping

## REST API Endpoints

- `GET /api/explore/getscheme`, `/getbranch`, `/getsub?branch_id=&sem=`
- `GET /api/documents/all`, `/api/documents/:id`, `/api/documents/:id/file`
- `GET /api/documents/filter?scheme=&branch=&semester=&subject=`
- `POST /api/upload` (multipart, session required)
- `PUT /api/user/login`, `POST /api/user/signup`,
  `POST|PUT /api/user/logout`, `PUT /api/user/validate`
*/

pub mod app;
pub mod auth;
pub mod cascade;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod provider;
pub mod selection;

pub use cascade::{CascadeError, FilterController, OptionSet, RefreshOutcome};
pub use catalog::{Catalog, CatalogProvider};
pub use filter::{filter_documents, Document, FilterOptions};
pub use provider::{OptionChoice, OptionProvider, ProviderError, RemoteProvider, UpstreamIds};
pub use selection::{Dimension, Selection, SelectionError, SelectionStore, ALL, DIMENSIONS};
