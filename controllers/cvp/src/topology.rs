//! Container topology builder
//!
//! Turns the flat `name -> parentContainerName` map of declared containers into
//! a rooted tree and derives the order CVP needs: a container can only be
//! created under an existing parent and only deleted once it is empty.
//!
//! Parents that are referenced but not declared are *anchors*. They are never
//! created or deleted here; they must already exist in CVP (the `Tenant` root
//! is the usual one).

use crate::error::TopologyError;
use cvp_state::Topology;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Declared containers arranged under their anchors
#[derive(Debug, Clone)]
pub struct ContainerTree {
    /// Declared container -> parent name
    parents: BTreeMap<String, String>,
    anchors: BTreeSet<String>,
    order: Vec<String>,
}

impl ContainerTree {
    /// Build the tree, rejecting a declared `root`, self-parents and cycles
    ///
    /// Children are visited in name order, so the derived orders are stable
    /// across runs.
    pub fn build(topology: &Topology, root: &str) -> Result<Self, TopologyError> {
        let mut parents = BTreeMap::new();
        for (name, spec) in topology {
            if name == root {
                return Err(TopologyError::RootDeclared(name.clone()));
            }
            if &spec.parent_container_name == name {
                return Err(TopologyError::SelfParent(name.clone()));
            }
            parents.insert(name.clone(), spec.parent_container_name.clone());
        }

        detect_cycles(&parents)?;

        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut anchors = BTreeSet::new();
        // BTreeMap iteration keeps every child list sorted
        for (name, parent) in &parents {
            children.entry(parent.clone()).or_default().push(name.clone());
            if !parents.contains_key(parent) {
                anchors.insert(parent.clone());
            }
        }

        let mut order = Vec::with_capacity(parents.len());
        for anchor in &anchors {
            visit(anchor, &children, &mut order);
        }

        Ok(Self {
            parents,
            anchors,
            order,
        })
    }

    /// Declared containers, every parent before its children
    pub fn creation_order(&self) -> &[String] {
        &self.order
    }

    /// Declared containers, every child before its parent
    pub fn deletion_order(&self) -> Vec<String> {
        self.order.iter().rev().cloned().collect()
    }

    /// Parents referenced by the declaration but not declared themselves
    pub fn anchors(&self) -> &BTreeSet<String> {
        &self.anchors
    }

    /// Declared parent of `name`; `None` for undeclared containers
    pub fn parent(&self, name: &str) -> Option<&str> {
        self.parents.get(name).map(String::as_str)
    }

    /// True when no container is declared
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Containers still to create, in creation order
    ///
    /// `exists` reports whether CVP already has a container of that name.
    pub fn to_create<F>(&self, exists: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.order.iter().filter(|n| !exists(n)).cloned().collect()
    }

    /// Existing containers to delete, in deletion order
    ///
    /// Declared containers for which `exists` is false are skipped.
    pub fn to_delete<F>(&self, exists: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.order.iter().rev().filter(|n| exists(n)).cloned().collect()
    }
}

fn visit(name: &str, children: &BTreeMap<String, Vec<String>>, order: &mut Vec<String>) {
    if let Some(kids) = children.get(name) {
        for child in kids {
            order.push(child.clone());
            visit(child, children, order);
        }
    }
}

fn detect_cycles(parents: &BTreeMap<String, String>) -> Result<(), TopologyError> {
    let mut rooted: HashSet<&str> = HashSet::new();

    for start in parents.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut current = start.as_str();

        while let Some(parent) = parents.get(current) {
            if rooted.contains(current) {
                break;
            }
            if let Some(pos) = path.iter().position(|n| *n == current) {
                let mut cycle: Vec<String> = path[pos..].iter().map(|n| n.to_string()).collect();
                cycle.push(current.to_string());
                return Err(TopologyError::Cycle(cycle));
            }
            path.push(current);
            current = parent.as_str();
        }

        rooted.extend(path);
    }
    Ok(())
}
