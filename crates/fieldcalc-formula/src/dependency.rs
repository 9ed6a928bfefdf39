//! Dependency tracking for calculated fields
//!
//! A [`DependencyGraph`] maps every formula-bearing field to the set of fields
//! its formula references. Unlike the AST, the graph can contain cycles; these
//! are data errors reported by [`DependencyGraph::find_circular_dependencies`].
//!
//! ```rust
//! use fieldcalc_formula::dependency::build_graph;
//!
//! let graph = build_graph([("total", "field1 + field2"), ("double", "total * 2")]).unwrap();
//! let order = graph.topological_sort().unwrap();
//!
//! let pos = |name: &str| order.iter().position(|f| f == name).unwrap();
//! assert!(pos("field1") < pos("total"));
//! assert!(pos("total") < pos("double"));
//! ```

use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::parser::parse_formula;
use ahash::{AHashMap, AHashSet};
use std::collections::{btree_set, BTreeMap, BTreeSet, VecDeque};

/// Collect every field referenced by a formula
pub fn extract_dependencies(expr: &FormulaExpr) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    let mut pending = vec![expr];

    while let Some(expr) = pending.pop() {
        match expr {
            FormulaExpr::FieldRef(name) => {
                deps.insert(name.clone());
            }
            FormulaExpr::BinaryOp { left, right, .. } => {
                pending.push(left);
                pending.push(right);
            }
            FormulaExpr::UnaryOp { operand, .. } => {
                pending.push(operand);
            }
            FormulaExpr::FunctionCall { args, .. } => {
                pending.extend(args);
            }
            // Literals have no references
            FormulaExpr::Literal(_) => {}
        }
    }

    deps
}

/// A formula given either as text or as an already parsed AST
#[derive(Debug, Clone, Copy)]
pub enum FormulaSource<'a> {
    Text(&'a str),
    Parsed(&'a FormulaExpr),
}

impl<'a> From<&'a str> for FormulaSource<'a> {
    fn from(text: &'a str) -> Self {
        FormulaSource::Text(text)
    }
}

impl<'a> From<&'a String> for FormulaSource<'a> {
    fn from(text: &'a String) -> Self {
        FormulaSource::Text(text.as_str())
    }
}

impl<'a> From<&'a FormulaExpr> for FormulaSource<'a> {
    fn from(expr: &'a FormulaExpr) -> Self {
        FormulaSource::Parsed(expr)
    }
}

/// Build a dependency graph from named formulas
///
/// Text formulas are parsed; a parse failure aborts the build.
pub fn build_graph<'a, I, K, F>(formulas: I) -> FormulaResult<DependencyGraph>
where
    I: IntoIterator<Item = (K, F)>,
    K: Into<String>,
    F: Into<FormulaSource<'a>>,
{
    let mut builder = DependencyGraphBuilder::new();
    for (name, formula) in formulas {
        builder.add_formula(name, formula)?;
    }
    Ok(builder.build())
}

/// Mutable builder for a [`DependencyGraph`]
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraphBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field with the dependencies of its formula
    pub fn add_formula<'a, K, F>(&mut self, name: K, formula: F) -> FormulaResult<&mut Self>
    where
        K: Into<String>,
        F: Into<FormulaSource<'a>>,
    {
        let deps = match formula.into() {
            FormulaSource::Text(text) => extract_dependencies(&parse_formula(text)?),
            FormulaSource::Parsed(expr) => extract_dependencies(expr),
        };
        Ok(self.add_dependencies(name, deps))
    }

    /// Add a field with an explicit dependency set
    pub fn add_dependencies<K, I, S>(&mut self, name: K, deps: I) -> &mut Self
    where
        K: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edges
            .entry(name.into())
            .or_default()
            .extend(deps.into_iter().map(Into::into));
        self
    }

    /// Finish the graph
    ///
    /// Every referenced field that has no formula of its own becomes a vertex
    /// with no dependencies, so the vertex set is closed.
    pub fn build(mut self) -> DependencyGraph {
        let referenced: Vec<String> = self
            .edges
            .values()
            .flatten()
            .filter(|dep| !self.edges.contains_key(*dep))
            .cloned()
            .collect();
        for field in referenced {
            self.edges.entry(field).or_default();
        }
        DependencyGraph { edges: self.edges }
    }
}

/// Read-only dependency graph: field → fields it depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// All vertices, sorted by name
    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.edges.keys().map(String::as_str)
    }

    /// Whether the field is a vertex of the graph
    pub fn contains(&self, field: &str) -> bool {
        self.edges.contains_key(field)
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no vertices
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Fields the given field depends on
    pub fn dependencies_of(&self, field: &str) -> impl Iterator<Item = &str> + '_ {
        self.edges
            .get(field)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Fields that directly depend on the given field
    pub fn dependents_of<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |(_, deps)| deps.contains(field))
            .map(|(name, _)| name.as_str())
    }

    /// Read-only view of the edges
    pub fn edges(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.edges
    }

    /// Detect circular dependencies
    ///
    /// Runs a depth-first search from every unvisited field. Within one search
    /// only the first cycle found is reported, as a path like `"a -> b -> a"`;
    /// searches started from other, disjoint parts of the graph still report
    /// their own cycle.
    pub fn find_circular_dependencies(&self) -> Result<(), Vec<String>> {
        let mut visited: AHashSet<&str> = AHashSet::new();
        let mut cycles = Vec::new();

        for start in self.fields() {
            if visited.contains(start) {
                continue;
            }

            if let Some(cycle) = self.detect_cycle(start, &mut visited) {
                cycles.push(cycle);
            }
        }

        if cycles.is_empty() {
            Ok(())
        } else {
            Err(cycles)
        }
    }

    /// Depth-first search from `start` with an explicit stack of pending
    /// dependency iterators, one per field on the current path
    fn detect_cycle<'a>(
        &'a self,
        start: &'a str,
        visited: &mut AHashSet<&'a str>,
    ) -> Option<String> {
        let mut on_stack: AHashSet<&str> = AHashSet::new();
        let mut path: Vec<&str> = vec![start];
        let mut frames: Vec<btree_set::Iter<'a, String>> = vec![self.dependency_iter(start)];
        visited.insert(start);
        on_stack.insert(start);

        while let Some(deps) = frames.last_mut() {
            let Some(dep) = deps.next() else {
                frames.pop();
                if let Some(field) = path.pop() {
                    on_stack.remove(field);
                }
                continue;
            };

            let dep = dep.as_str();
            if on_stack.contains(dep) {
                // The cycle is the path from the first occurrence of dep, closed by dep
                let from = path.iter().position(|f| *f == dep).unwrap_or(0);
                let mut cycle: Vec<&str> = path[from..].to_vec();
                cycle.push(dep);
                return Some(cycle.join(" -> "));
            }
            if visited.insert(dep) {
                on_stack.insert(dep);
                path.push(dep);
                frames.push(self.dependency_iter(dep));
            }
        }

        None
    }

    fn dependency_iter(&self, field: &str) -> btree_set::Iter<'_, String> {
        self.edges
            .get(field)
            .map(|deps| deps.iter())
            .unwrap_or_default()
    }

    /// Order fields so every field comes after all fields it depends on
    ///
    /// Fails with [`FormulaError::CircularDependency`] when the graph has a
    /// cycle. Fields that become ready at the same time are emitted by name.
    pub fn topological_sort(&self) -> FormulaResult<Vec<String>> {
        self.find_circular_dependencies()
            .map_err(|cycles| FormulaError::CircularDependency { cycles })?;

        // Remaining unresolved dependencies per field
        let mut remaining: AHashMap<&str, usize> = AHashMap::with_capacity(self.edges.len());
        // Field -> fields waiting on it
        let mut waiting: AHashMap<&str, Vec<&str>> = AHashMap::new();
        for (field, deps) in &self.edges {
            let known: Vec<&str> = deps
                .iter()
                .map(String::as_str)
                .filter(|d| self.edges.contains_key(*d))
                .collect();
            remaining.insert(field.as_str(), known.len());
            for dep in known {
                waiting.entry(dep).or_default().push(field.as_str());
            }
        }

        let mut queue: VecDeque<&str> = self
            .fields()
            .filter(|f| remaining.get(f).copied() == Some(0))
            .collect();
        let mut order = Vec::with_capacity(self.edges.len());

        while let Some(field) = queue.pop_front() {
            order.push(field.to_string());
            let Some(dependents) = waiting.get(field) else {
                continue;
            };
            for &dependent in dependents {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        Ok(order)
    }

    /// Fields that must be recalculated when the given fields change
    ///
    /// Returns the transitive dependents of `changed` (excluding the changed
    /// fields themselves unless they depend on another changed field), in
    /// evaluation order.
    pub fn affected_by(&self, changed: &[&str]) -> FormulaResult<Vec<String>> {
        let mut affected: AHashSet<&str> = AHashSet::new();
        let mut stack: Vec<&str> = changed.to_vec();
        while let Some(field) = stack.pop() {
            for dependent in self.dependents_of(field) {
                if affected.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }

        let order = self.topological_sort()?;
        Ok(order
            .into_iter()
            .filter(|f| affected.contains(f.as_str()))
            .collect())
    }
}
