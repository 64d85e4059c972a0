//! State-merging automaton over log templates.
//!
//! A [`StateGraph`] owns a set of states, each accepting one or more log
//! templates, connected by labeled edges held in a [`SparseAdjacency`]. The
//! graph supports structural merging of states while keeping it
//! *deterministic*: no state may have two successors that accept a common
//! template.
//!
//! # Identity and interning
//!
//! States are identified by a [`StateId`] handle assigned at creation and
//! never reused. The content of a state (its template set and terminal flag)
//! is a [`StateProperties`] record interned by content hash, so states with
//! identical content share one `Arc` and equivalence is a pointer check.
//! Records are never mutated in place: a merge builds a new record and
//! re-interns it.
//!
//! # Determinization
//!
//! Merging two states can make their former successors collide, and merging
//! those can cascade through the graph. [`StateGraph::determinize`] runs an
//! explicit worklist of "states whose successors must be re-checked":
//!
//! ```text
//! seed: the given state + its parents
//! loop: pop X
//!         while two successors of X share a template: merge them into K
//!         if nothing merged: enqueue each successor of X not yet visited
//!         otherwise: enqueue every K, parents(K), every successor of X
//! until the worklist is empty
//! ```
//!
//! Every state reachable from the seed is examined at least once. After
//! that, work is only enqueued by a merge, and every merge removes a state,
//! so the loop terminates on any finite graph, including graphs where a
//! state is merged with one of its own ancestors.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::error::{GraphError, Result};
use crate::sparse_adjacency::SparseAdjacency;
use crate::template_tree::TemplateClassifier;

/// Template accepted by the start state of a freshly built graph.
pub const ROOT_TEMPLATE: &str = "root";
/// Template accepted by the terminal state of a freshly built graph.
pub const TERMINAL_TEMPLATE: &str = "terminal";

// =============================================================================
// Handles and properties
// =============================================================================

/// Graph-assigned state handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(u64);

impl StateId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Content of a state: the templates it accepts and its terminal flag.
///
/// Templates are kept sorted and deduplicated, so two records are equal
/// exactly when they accept the same set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateProperties {
    log_templates: Vec<String>,
    is_terminal: bool,
}

impl StateProperties {
    /// Non-terminal properties accepting `templates`.
    #[must_use]
    pub fn new<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut log_templates: Vec<String> = templates.into_iter().map(Into::into).collect();
        log_templates.sort_unstable();
        log_templates.dedup();
        Self {
            log_templates,
            is_terminal: false,
        }
    }

    /// Same templates, with the terminal flag set.
    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.is_terminal = true;
        self
    }

    #[must_use]
    pub fn templates(&self) -> &[String] {
        &self.log_templates
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    /// Whether this state accepts `template`.
    #[must_use]
    pub fn accepts(&self, template: &str) -> bool {
        self.log_templates
            .binary_search_by(|t| t.as_str().cmp(template))
            .is_ok()
    }

    /// Weak equivalence: at least one template in common.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.log_templates.len() && j < other.log_templates.len() {
            match self.log_templates[i].cmp(&other.log_templates[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// Union of both template sets; terminal if either side is.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = Self::new(
            self.log_templates
                .iter()
                .chain(other.log_templates.iter())
                .cloned(),
        );
        merged.is_terminal = self.is_terminal || other.is_terminal;
        merged
    }

    /// SHA-256 hex digest of the record's content.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for template in &self.log_templates {
            hasher.update(template.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([u8::from(self.is_terminal)]);
        format!("{:x}", hasher.finalize())
    }
}

/// Content-hash interner for [`StateProperties`] records.
#[derive(Debug, Clone, Default)]
struct PropertyInterner {
    by_hash: HashMap<String, Arc<StateProperties>>,
}

impl PropertyInterner {
    /// Return the shared record for `props`, registering it if new.
    fn intern(&mut self, props: StateProperties) -> Arc<StateProperties> {
        let key = props.content_hash();
        Arc::clone(self.by_hash.entry(key).or_insert_with(|| Arc::new(props)))
    }

    /// Number of distinct records seen.
    fn len(&self) -> usize {
        self.by_hash.len()
    }
}

/// Edge payload: free-form labels (transition probabilities on exported
/// chains, empty on prefix trees).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeProperties {
    pub labels: Vec<String>,
}

impl EdgeProperties {
    #[must_use]
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for EdgeProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels.join(","))
    }
}

// =============================================================================
// Graph
// =============================================================================

/// Directed graph of template-accepting states.
#[derive(Debug, Clone)]
pub struct StateGraph {
    edges: SparseAdjacency<EdgeProperties>,
    states: BTreeMap<StateId, Arc<StateProperties>>,
    interner: PropertyInterner,
    start: StateId,
    terminal: StateId,
    next_id: u64,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGraph {
    /// Graph with a `root` start state and a `terminal` terminal state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoints(
            StateProperties::new([ROOT_TEMPLATE]),
            StateProperties::new([TERMINAL_TEMPLATE]).terminal(),
        )
    }

    /// Graph with caller-supplied start and terminal properties.
    #[must_use]
    pub fn with_endpoints(start: StateProperties, terminal: StateProperties) -> Self {
        let mut graph = Self::bare();
        graph.start = graph.add_state(start);
        graph.terminal = graph.add_state(terminal);
        graph
    }

    fn bare() -> Self {
        Self {
            edges: SparseAdjacency::new(),
            states: BTreeMap::new(),
            interner: PropertyInterner::default(),
            start: StateId(0),
            terminal: StateId(0),
            next_id: 0,
        }
    }

    /// Build a prefix tree from template traces.
    ///
    /// Every trace walks from the start state, following the successor that
    /// accepts the next template or creating one, and its last state gets an
    /// edge to the terminal state. The result is deterministic by
    /// construction.
    #[must_use]
    pub fn from_traces<T, S>(traces: &[T]) -> Self
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut graph = Self::new();
        for trace in traces {
            let mut current = graph.start;
            for template in trace.as_ref() {
                let template = template.as_ref();
                let existing = graph
                    .children_of(current)
                    .into_iter()
                    .find(|&child| graph.states[&child].accepts(template));
                current = match existing {
                    Some(child) => child,
                    None => {
                        let child = graph.add_state(StateProperties::new([template]));
                        graph.add_edge(current, child, EdgeProperties::default());
                        child
                    }
                };
            }
            graph.add_edge(current, graph.terminal, EdgeProperties::default());
        }
        debug!(
            traces = traces.len(),
            states = graph.len(),
            edges = graph.edge_count(),
            "Prefix tree built"
        );
        graph
    }

    // ── Accessors ────────────────────────────────────────────────────────

    #[must_use]
    pub fn start(&self) -> StateId {
        self.start
    }

    #[must_use]
    pub fn terminal(&self) -> StateId {
        self.terminal
    }

    /// Number of states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of distinct property records interned so far.
    #[must_use]
    pub fn interned_count(&self) -> usize {
        self.interner.len()
    }

    #[must_use]
    pub fn contains(&self, state: StateId) -> bool {
        self.states.contains_key(&state)
    }

    /// Live state handles, ascending.
    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states.keys().copied()
    }

    pub fn properties(&self, state: StateId) -> Result<&StateProperties> {
        Ok(self.shared_properties(state)?.as_ref())
    }

    /// The interned record itself; equal content yields pointer-equal `Arc`s.
    pub fn shared_properties(&self, state: StateId) -> Result<&Arc<StateProperties>> {
        self.states
            .get(&state)
            .ok_or_else(|| GraphError::StateNotFound(state).into())
    }

    #[must_use]
    pub fn edge(&self, from: StateId, to: StateId) -> Option<&EdgeProperties> {
        self.edges.get(from.0, to.0)
    }

    // ── Construction ─────────────────────────────────────────────────────

    /// Add a new state, returning its handle.
    ///
    /// Handles come from a counter that [`Self::restore_state`] keeps ahead
    /// of every restored handle, so a fresh state never collides with a
    /// live one. Use `restore_state` to insert under a chosen handle; that
    /// path reports [`GraphError::StateAlreadyExists`].
    pub fn add_state(&mut self, props: StateProperties) -> StateId {
        let id = StateId(self.next_id);
        self.next_id += 1;
        let shared = self.interner.intern(props);
        self.states.insert(id, shared);
        id
    }

    /// Insert a state under a caller-chosen handle (used when reloading).
    pub fn restore_state(&mut self, id: StateId, props: StateProperties) -> Result<()> {
        if self.states.contains_key(&id) {
            return Err(GraphError::StateAlreadyExists(id).into());
        }
        let shared = self.interner.intern(props);
        self.states.insert(id, shared);
        self.next_id = self.next_id.max(id.0 + 1);
        Ok(())
    }

    /// Record an edge. Returns `false` if either endpoint is unknown or the
    /// edge already exists. Determinism is not checked here.
    pub fn add_edge(&mut self, from: StateId, to: StateId, props: EdgeProperties) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        self.edges.insert(from.0, to.0, props)
    }

    // ── Neighborhood ─────────────────────────────────────────────────────

    fn require(&self, state: StateId) -> Result<()> {
        if self.contains(state) {
            Ok(())
        } else {
            Err(GraphError::StateNotFound(state).into())
        }
    }

    fn children_of(&self, state: StateId) -> Vec<StateId> {
        self.edges
            .children(state.0)
            .into_iter()
            .map(|(dst, _)| StateId(dst))
            .collect()
    }

    fn parents_of(&self, state: StateId) -> Vec<StateId> {
        self.edges.parents(state.0).into_iter().map(StateId).collect()
    }

    /// Successors of `state`, including itself on a self-loop.
    pub fn outgoing_states(&self, state: StateId) -> Result<Vec<StateId>> {
        self.require(state)?;
        Ok(self.children_of(state))
    }

    /// Successors of `state`, excluding itself.
    pub fn outgoing_states_not_self(&self, state: StateId) -> Result<Vec<StateId>> {
        let mut out = self.outgoing_states(state)?;
        out.retain(|&s| s != state);
        Ok(out)
    }

    /// Labels of the edges leaving `state`, in successor order.
    pub fn outgoing_props(&self, state: StateId) -> Result<Vec<EdgeProperties>> {
        self.require(state)?;
        Ok(self
            .edges
            .children(state.0)
            .into_iter()
            .map(|(_, props)| props.clone())
            .collect())
    }

    /// Predecessors of `state`.
    pub fn incoming_states(&self, state: StateId) -> Result<Vec<StateId>> {
        self.require(state)?;
        Ok(self.parents_of(state))
    }

    // ── Merging ──────────────────────────────────────────────────────────

    /// Merge `discard` into `keep`.
    ///
    /// `keep` accepts the union of both template sets and is terminal if
    /// either was; every edge touching `discard` is re-parented onto `keep`;
    /// `discard` is removed. This does not restore determinism.
    pub fn merge_states(&mut self, keep: StateId, discard: StateId) -> Result<()> {
        if keep == discard {
            return Err(GraphError::SelfMerge(keep).into());
        }
        let keep_props = Arc::clone(self.shared_properties(keep)?);
        let discard_props = Arc::clone(self.shared_properties(discard)?);

        let merged = if Arc::ptr_eq(&keep_props, &discard_props) {
            keep_props
        } else {
            self.interner.intern(keep_props.union(&discard_props))
        };
        self.states.insert(keep, merged);

        if self.start == discard {
            self.start = keep;
        }
        if self.terminal == discard {
            self.terminal = keep;
        }

        self.edges.change_parent_of_children(keep.0, discard.0);
        self.edges.change_children_of_parents(discard.0, keep.0);
        self.states.remove(&discard);
        trace!(%keep, %discard, "Merged states");
        Ok(())
    }

    /// Merge `b` into `a`, then determinize around the result.
    pub fn full_merge_states(&mut self, a: StateId, b: StateId) -> Result<StateId> {
        self.merge_states(a, b)?;
        self.determinize(a)
    }

    /// Merge `state` with its non-self successors, then determinize.
    ///
    /// With `selection = None` every successor is merged. Otherwise only the
    /// successors at the given positions of [`Self::outgoing_states_not_self`]
    /// are merged, and terminal successors are skipped.
    pub fn full_merge_states_with_children(
        &mut self,
        state: StateId,
        selection: Option<&[usize]>,
    ) -> Result<StateId> {
        let children = self.outgoing_states_not_self(state)?;
        for (position, child) in children.into_iter().enumerate() {
            let wanted = match selection {
                None => true,
                Some(positions) => {
                    positions.contains(&position) && !self.properties(child)?.is_terminal()
                }
            };
            if wanted {
                self.merge_states(state, child)?;
            }
        }
        self.determinize(state)
    }

    // ── Determinization ──────────────────────────────────────────────────

    /// Restore determinism everywhere a change around `state` can reach.
    ///
    /// Returns the handle `state` ended up merged into (itself if it
    /// survived).
    pub fn determinize(&mut self, state: StateId) -> Result<StateId> {
        let mut forward = HashMap::new();
        self.determinize_with(state, &mut forward, true)?;
        Ok(resolve(&forward, state))
    }

    /// Worklist fixpoint behind [`Self::determinize`].
    ///
    /// A state is re-examined whenever a merge changes its successors or
    /// the templates of one of them. With `sweep` set, states that need no
    /// merge still hand their successors to the worklist once, so
    /// nondeterminism already present below `state` is found as well.
    fn determinize_with(
        &mut self,
        state: StateId,
        forward: &mut HashMap<StateId, StateId>,
        sweep: bool,
    ) -> Result<()> {
        self.require(state)?;

        let mut queue = VecDeque::new();
        let mut queued = HashSet::new();
        let mut visited = HashSet::from([state]);

        enqueue(&mut queue, &mut queued, state);
        for parent in self.parents_of(state) {
            enqueue(&mut queue, &mut queued, parent);
        }

        let mut total_merges = 0usize;
        while let Some(next) = queue.pop_front() {
            queued.remove(&next);
            let node = resolve(forward, next);
            if !self.contains(node) {
                continue;
            }

            let merges = self.merge_overlapping_children(node)?;
            if merges.is_empty() {
                if sweep {
                    for child in self.children_of(node) {
                        if child != node && visited.insert(child) {
                            enqueue(&mut queue, &mut queued, child);
                        }
                    }
                }
                continue;
            }
            total_merges += merges.len();

            for &(keep, discard) in &merges {
                forward.insert(discard, keep);
            }
            for &(keep, _) in &merges {
                let keep = resolve(forward, keep);
                enqueue(&mut queue, &mut queued, keep);
                for parent in self.parents_of(keep) {
                    enqueue(&mut queue, &mut queued, parent);
                }
            }
            let node = resolve(forward, node);
            for child in self.children_of(node) {
                if child != node {
                    enqueue(&mut queue, &mut queued, child);
                }
            }
        }

        if total_merges > 0 {
            debug!(%state, merges = total_merges, states = self.len(), "Determinized");
        }
        Ok(())
    }

    /// Merge successors of `current` until no two share a template.
    ///
    /// Returns the (possibly new) handle of `current` and whether anything
    /// was merged. Only this one level is fixed; use [`Self::determinize`]
    /// for the cascading fixpoint.
    pub fn merge_equivalent_children(&mut self, current: StateId) -> Result<(StateId, bool)> {
        self.require(current)?;
        let merges = self.merge_overlapping_children(current)?;
        Ok((current, !merges.is_empty()))
    }

    /// Returns every `(keep, discard)` merge performed. `current` is always
    /// kept when it is one of the colliding successors.
    fn merge_overlapping_children(
        &mut self,
        current: StateId,
    ) -> Result<Vec<(StateId, StateId)>> {
        let mut merges = Vec::new();
        while let Some((first, second)) = self.find_overlapping_children(current) {
            let (keep, discard) = if second == current {
                (second, first)
            } else {
                (first, second)
            };
            self.merge_states(keep, discard)?;
            merges.push((keep, discard));
        }
        Ok(merges)
    }

    /// First pair of successors of `state` accepting a common template.
    fn find_overlapping_children(&self, state: StateId) -> Option<(StateId, StateId)> {
        let mut owner: HashMap<&str, StateId> = HashMap::new();
        for child in self.children_of(state) {
            let props = &self.states[&child];
            for template in props.templates() {
                if let Some(&earlier) = owner.get(template.as_str()) {
                    if earlier != child {
                        return Some((earlier, child));
                    }
                }
                owner.insert(template.as_str(), child);
            }
        }
        None
    }

    /// First state (with its two colliding successors) violating
    /// determinism, scanning every live state.
    #[must_use]
    pub fn find_nondeterminism(&self) -> Option<(StateId, StateId, StateId)> {
        self.states.keys().find_map(|&state| {
            self.find_overlapping_children(state)
                .map(|(a, b)| (state, a, b))
        })
    }

    // ── Loop collapsing ──────────────────────────────────────────────────

    /// Fold runs of identical states into self-loops.
    ///
    /// Depth-first from the start state, every state absorbs directly
    /// adjacent successors with identical properties, and the graph is
    /// re-determinized after each absorption. A state is visited at most
    /// once per traversal path.
    pub fn collapse_repeated_states(&mut self) -> Result<()> {
        let before = self.len();
        let mut forward = HashMap::new();
        let mut stack: Vec<(StateId, HashSet<StateId>)> = vec![(self.start, HashSet::new())];

        while let Some((next, mut visited)) = stack.pop() {
            let mut current = resolve(&forward, next);
            if !self.contains(current) || visited.contains(&current) {
                continue;
            }

            loop {
                let current_props = Arc::clone(&self.states[&current]);
                let twin = self
                    .children_of(current)
                    .into_iter()
                    .find(|&c| c != current && Arc::ptr_eq(&self.states[&c], &current_props));
                let Some(twin) = twin else {
                    break;
                };
                self.merge_states(current, twin)?;
                forward.insert(twin, current);
                self.determinize_with(current, &mut forward, false)?;
                current = resolve(&forward, current);
            }

            self.determinize_with(current, &mut forward, false)?;
            current = resolve(&forward, current);

            visited.insert(current);
            for child in self.children_of(current) {
                if child != current && !visited.contains(&child) {
                    stack.push((child, visited.clone()));
                }
            }
        }

        debug!(before, after = self.len(), "Collapsed repeated states");
        Ok(())
    }

    // ── Trace matching ───────────────────────────────────────────────────

    /// Whether `trace` (a sequence of template names) is accepted: a unique
    /// path from the start state consumes it and ends next to a terminal
    /// state.
    pub fn match_log_template_trace<S: AsRef<str>>(&self, trace: &[S]) -> Result<bool> {
        self.accepts_sequence(trace.iter().map(|t| Some(t.as_ref())))
    }

    /// Like [`Self::match_log_template_trace`], classifying raw log lines
    /// on the fly. An unclassifiable line rejects the trace.
    pub fn match_trace<S, C>(&self, lines: &[S], classifier: &C) -> Result<bool>
    where
        S: AsRef<str>,
        C: TemplateClassifier + ?Sized,
    {
        self.accepts_sequence(lines.iter().map(|line| classifier.classify(line.as_ref())))
    }

    fn accepts_sequence<'t, I>(&self, templates: I) -> Result<bool>
    where
        I: IntoIterator<Item = Option<&'t str>>,
    {
        let mut node = self.start;
        for template in templates {
            let Some(template) = template else {
                return Ok(false);
            };
            if self.states[&node].is_terminal() {
                return Ok(false);
            }
            let matches: Vec<StateId> = self
                .children_of(node)
                .into_iter()
                .filter(|child| self.states[child].accepts(template))
                .collect();
            match matches.as_slice() {
                [] => return Ok(false),
                [only] => node = *only,
                _ => {
                    return Err(GraphError::NonDeterminism {
                        state: node,
                        template: template.to_string(),
                        matches: matches.len(),
                    }
                    .into());
                }
            }
        }
        Ok(self
            .children_of(node)
            .into_iter()
            .any(|child| self.states[&child].is_terminal()))
    }

    // ── Persistence ──────────────────────────────────────────────────────

    /// Serializable copy of the graph.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut edges: Vec<SnapshotEdge> = self
            .edges
            .iter()
            .map(|(from, to, props)| SnapshotEdge {
                from: StateId(from),
                to: StateId(to),
                props: props.clone(),
            })
            .collect();
        edges.sort_by_key(|e| (e.from, e.to));
        GraphSnapshot {
            start: self.start,
            terminal: self.terminal,
            states: self
                .states
                .iter()
                .map(|(&id, props)| SnapshotState {
                    id,
                    templates: props.templates().to_vec(),
                    is_terminal: props.is_terminal(),
                })
                .collect(),
            edges,
        }
    }

    /// Rebuild a graph from a snapshot, re-interning property records.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = Self::bare();
        for state in snapshot.states {
            let mut props = StateProperties::new(state.templates);
            props.is_terminal = state.is_terminal;
            graph.restore_state(state.id, props)?;
        }
        graph.require(snapshot.start)?;
        graph.require(snapshot.terminal)?;
        graph.start = snapshot.start;
        graph.terminal = snapshot.terminal;
        for edge in snapshot.edges {
            graph.require(edge.from)?;
            graph.require(edge.to)?;
            graph.add_edge(edge.from, edge.to, edge.props);
        }
        Ok(graph)
    }

    /// Write the graph as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), &self.snapshot())?;
        Ok(())
    }

    /// Load a graph written by [`Self::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let snapshot: GraphSnapshot = serde_json::from_reader(BufReader::new(file))?;
        Self::from_snapshot(snapshot)
    }
}

fn resolve(forward: &HashMap<StateId, StateId>, mut id: StateId) -> StateId {
    while let Some(&next) = forward.get(&id) {
        id = next;
    }
    id
}

fn enqueue(queue: &mut VecDeque<StateId>, queued: &mut HashSet<StateId>, id: StateId) {
    if queued.insert(id) {
        queue.push_back(id);
    }
}

// =============================================================================
// Snapshot (Serializable)
// =============================================================================

/// Serializable form of a [`StateGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub start: StateId,
    pub terminal: StateId,
    pub states: Vec<SnapshotState>,
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotState {
    pub id: StateId,
    pub templates: Vec<String>,
    pub is_terminal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub from: StateId,
    pub to: StateId,
    pub props: EdgeProperties,
}

// =============================================================================
// Tests
// =============================================================================
