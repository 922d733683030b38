//! Organization hierarchy keyed by prefix-encoded codes.
//!
//! Ancestry is decided by the code string alone: `050101` is a descendant of
//! `0501` because it starts with it. `parent_org_code` is only used to group
//! direct children for display. Both are consulted when guarding against
//! cycles so that denormalized legacy rows cannot sneak one in.

use crate::error::AccessError;
use crate::models::{Organization, OrganizationDraft, RoleLevel};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use validator::Validate;

/// True when `candidate` lies strictly beneath `ancestor` in the code space.
/// Empty codes are never related to anything.
pub fn is_descendant_of(candidate: &str, ancestor: &str) -> bool {
    !ancestor.is_empty() && candidate.len() > ancestor.len() && candidate.starts_with(ancestor)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("organization {0} cannot be its own parent")]
    SelfParent(String),

    #[error("organization {parent} is a descendant of {target} and cannot become its parent")]
    DescendantParent { target: String, parent: String },

    #[error("parent organization {0} does not exist")]
    UnknownParent(String),

    #[error("parent organization {0} is disabled")]
    ParentDisabled(String),

    #[error("parent organization {0} is outside your organization scope")]
    ParentOutOfScope(String),

    #[error("organization {0} is outside your organization scope")]
    OutOfScope(String),

    #[error("organization {0} does not exist")]
    UnknownOrganization(String),

    #[error("organization code {0} is already in use")]
    DuplicateCode(String),

    #[error("organization code {code} must start with its parent code {parent}")]
    CodeNotUnderParent { code: String, parent: String },

    #[error("organization code {code} would fall under {existing} rather than {parent}")]
    IntermediateNode {
        code: String,
        parent: String,
        existing: String,
    },

    #[error("organization code {code} would absorb the existing branch {existing}")]
    CapturesBranch { code: String, existing: String },

    #[error("root organization code {code} falls under existing organization {existing}")]
    RootUnderPrefix { code: String, existing: String },

    #[error("organization {code} still has {children} child organization(s)")]
    HasChildren { code: String, children: usize },

    #[error("organization {original} cannot be renumbered to {code} while it has {children} child organization(s)")]
    RecodeWithChildren {
        original: String,
        code: String,
        children: usize,
    },
}

/// Which organizations a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgScope {
    All,
    Subtree { home: String, include_home: bool },
}

impl OrgScope {
    /// Drop the home node itself, used when picking a parent for the home
    /// organization's own edit form.
    pub fn excluding_home(self) -> Self {
        match self {
            OrgScope::Subtree { home, .. } => OrgScope::Subtree {
                home,
                include_home: false,
            },
            OrgScope::All => OrgScope::All,
        }
    }

    pub fn contains_code(&self, code: &str) -> bool {
        match self {
            OrgScope::All => true,
            OrgScope::Subtree { home, include_home } => {
                if home.is_empty() {
                    return false;
                }
                (*include_home && code == home) || is_descendant_of(code, home)
            }
        }
    }

    pub fn contains(&self, org: &Organization) -> bool {
        self.contains_code(&org.code)
    }
}

/// Super-admins see every organization; everyone else sees their home
/// organization and its descendants.
pub fn visible_scope(role_level: RoleLevel, home_org_code: &str) -> OrgScope {
    match role_level {
        RoleLevel::SuperAdmin => OrgScope::All,
        RoleLevel::OrgAdmin | RoleLevel::NormalUser => OrgScope::Subtree {
            home: home_org_code.trim().to_string(),
            include_home: true,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Only enabled organizations whose ancestors are all enabled.
    Effective,
    All,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrgTreeNode {
    #[serde(flatten)]
    pub org: Organization,
    pub children: Vec<OrgTreeNode>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrgForest {
    pub roots: Vec<OrgTreeNode>,
}

impl OrgForest {
    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first `(depth, org)` pairs in display order.
    pub fn flatten(&self) -> Vec<(usize, &Organization)> {
        fn walk<'a>(node: &'a OrgTreeNode, depth: usize, out: &mut Vec<(usize, &'a Organization)>) {
            out.push((depth, &node.org));
            for child in &node.children {
                walk(child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, 0, &mut out);
        }
        out
    }

    pub fn find(&self, code: &str) -> Option<&OrgTreeNode> {
        fn search<'a>(nodes: &'a [OrgTreeNode], code: &str) -> Option<&'a OrgTreeNode> {
            nodes.iter().find_map(|node| {
                if node.org.code == code {
                    Some(node)
                } else {
                    search(&node.children, code)
                }
            })
        }

        search(&self.roots, code)
    }
}

/// Indexed view over a flat organization list.
#[derive(Debug, Clone, Default)]
pub struct OrgHierarchy {
    orgs: Vec<Organization>,
    by_code: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
}

impl OrgHierarchy {
    pub fn new(orgs: Vec<Organization>) -> Self {
        let mut kept: Vec<Organization> = Vec::with_capacity(orgs.len());
        let mut by_code = HashMap::new();

        for org in orgs {
            if by_code.contains_key(&org.code) {
                tracing::warn!(org_code = %org.code, "Duplicate organization code ignored");
                continue;
            }
            by_code.insert(org.code.clone(), kept.len());
            kept.push(org);
        }

        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, org) in kept.iter().enumerate() {
            if let Some(parent) = &org.parent_code {
                if parent != &org.code {
                    children.entry(parent.clone()).or_default().push(idx);
                }
            }
        }

        Self {
            orgs: kept,
            by_code,
            children,
        }
    }

    pub fn len(&self) -> usize {
        self.orgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
    }

    pub fn organizations(&self) -> &[Organization] {
        &self.orgs
    }

    pub fn get(&self, code: &str) -> Option<&Organization> {
        self.by_code.get(code).map(|&idx| &self.orgs[idx])
    }

    /// Direct children by parent reference.
    pub fn children_of(&self, code: &str) -> Vec<&Organization> {
        self.children
            .get(code)
            .map(|indices| indices.iter().map(|&idx| &self.orgs[idx]).collect())
            .unwrap_or_default()
    }

    /// Walk the `parent_code` chain upwards from `code`, stopping at roots,
    /// unknown parents or a repeated node.
    fn parent_chain(&self, code: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = self.get(code);

        while let Some(org) = current {
            if !seen.insert(org.code.as_str()) {
                break;
            }
            match org.parent_code.as_deref() {
                Some(parent) if parent != org.code => {
                    chain.push(parent);
                    current = self.get(parent);
                }
                _ => break,
            }
        }

        chain
    }

    /// Descendant by code prefix or by parent reference.
    fn is_below(&self, candidate: &str, ancestor: &str) -> bool {
        is_descendant_of(candidate, ancestor)
            || (candidate != ancestor && self.parent_chain(candidate).contains(&ancestor))
    }

    /// Enabled, and no ancestor (by prefix or parent reference) is disabled.
    pub fn is_effective(&self, code: &str) -> bool {
        let Some(org) = self.get(code) else {
            return false;
        };
        if !org.is_enabled() {
            return false;
        }

        let disabled_prefix = self
            .orgs
            .iter()
            .any(|other| !other.is_enabled() && is_descendant_of(code, &other.code));
        if disabled_prefix {
            return false;
        }

        self.parent_chain(code)
            .iter()
            .all(|parent| self.get(parent).is_none_or(Organization::is_enabled))
    }

    pub fn visible(&self, scope: &OrgScope) -> Vec<&Organization> {
        self.orgs.iter().filter(|org| scope.contains(org)).collect()
    }

    /// Every organization beneath `code`, by prefix or parent reference.
    pub fn descendants_of(&self, code: &str) -> Vec<&Organization> {
        self.orgs
            .iter()
            .filter(|org| self.is_below(&org.code, code))
            .collect()
    }

    /// Build the display forest. Organizations whose parent is absent from
    /// the included set become roots, so a scoped subset is rooted at the
    /// caller's home organization.
    pub fn build_tree(&self, membership: Membership) -> OrgForest {
        let included: Vec<usize> = (0..self.orgs.len())
            .filter(|&idx| match membership {
                Membership::All => true,
                Membership::Effective => self.is_effective(&self.orgs[idx].code),
            })
            .collect();
        let included_codes: HashSet<&str> = included
            .iter()
            .map(|&idx| self.orgs[idx].code.as_str())
            .collect();

        let mut roots: Vec<usize> = Vec::new();
        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();

        for &idx in &included {
            let org = &self.orgs[idx];
            match org.parent_code.as_deref() {
                Some(parent) if parent != org.code && included_codes.contains(parent) => {
                    children.entry(parent).or_default().push(idx);
                }
                _ => roots.push(idx),
            }
        }

        let by_code = |a: &usize, b: &usize| self.orgs[*a].code.cmp(&self.orgs[*b].code);
        roots.sort_by(by_code);
        for list in children.values_mut() {
            list.sort_by(by_code);
        }

        fn build_subtree(
            idx: usize,
            orgs: &[Organization],
            children: &HashMap<&str, Vec<usize>>,
            visited: &mut HashSet<usize>,
        ) -> OrgTreeNode {
            visited.insert(idx);
            let org = &orgs[idx];
            let nodes = children
                .get(org.code.as_str())
                .map(|list| {
                    list.iter()
                        .filter(|&&child| !visited.contains(&child))
                        .copied()
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
                .into_iter()
                .map(|child| build_subtree(child, orgs, children, visited))
                .collect();

            OrgTreeNode {
                org: org.clone(),
                children: nodes,
            }
        }

        let mut visited = HashSet::new();
        let forest = OrgForest {
            roots: roots
                .into_iter()
                .map(|idx| build_subtree(idx, &self.orgs, &children, &mut visited))
                .collect(),
        };

        if visited.len() < included.len() {
            let stranded: Vec<&str> = included
                .iter()
                .filter(|idx| !visited.contains(idx))
                .map(|&idx| self.orgs[idx].code.as_str())
                .collect();
            tracing::warn!(
                org_codes = ?stranded,
                "Organizations in a parent reference cycle were left out of the tree"
            );
        }

        forest
    }

    /// Whether `parent_code` may be chosen as the parent of `target`
    /// (`None` when creating a new organization).
    pub fn check_parent(
        &self,
        scope: &OrgScope,
        target: Option<&str>,
        parent_code: &str,
    ) -> Result<(), HierarchyError> {
        if let Some(target) = target {
            if parent_code == target {
                return Err(HierarchyError::SelfParent(target.to_string()));
            }
            if self.is_below(parent_code, target) {
                return Err(HierarchyError::DescendantParent {
                    target: target.to_string(),
                    parent: parent_code.to_string(),
                });
            }
        }

        if self.get(parent_code).is_none() {
            return Err(HierarchyError::UnknownParent(parent_code.to_string()));
        }
        if !self.is_effective(parent_code) {
            return Err(HierarchyError::ParentDisabled(parent_code.to_string()));
        }
        if !scope.contains_code(parent_code) {
            return Err(HierarchyError::ParentOutOfScope(parent_code.to_string()));
        }

        Ok(())
    }

    /// Organizations offered as parent for `target`. Uses the same predicate
    /// as `check_parent`, so anything left out here is rejected there.
    pub fn candidate_parents(&self, scope: &OrgScope, target: Option<&str>) -> Vec<&Organization> {
        self.orgs
            .iter()
            .filter(|org| self.check_parent(scope, target, &org.code).is_ok())
            .collect()
    }

    /// Validate a create (`editing == None`) or edit submission before it is
    /// sent anywhere.
    pub fn validate_draft(
        &self,
        scope: &OrgScope,
        draft: &OrganizationDraft,
        editing: Option<&str>,
    ) -> Result<(), AccessError> {
        draft.validate()?;
        self.check_draft(scope, draft, editing)?;
        Ok(())
    }

    fn check_draft(
        &self,
        scope: &OrgScope,
        draft: &OrganizationDraft,
        editing: Option<&str>,
    ) -> Result<(), HierarchyError> {
        let code = draft.code.as_str();

        let current = match editing {
            Some(original) => match self.get(original) {
                Some(org) => Some(org),
                None => return Err(HierarchyError::UnknownOrganization(original.to_string())),
            },
            None => None,
        };

        if let Some(org) = current {
            if org.code != code {
                // Descendant codes carry the old prefix.
                let children = self.descendants_of(&org.code).len();
                if children > 0 {
                    return Err(HierarchyError::RecodeWithChildren {
                        original: org.code.clone(),
                        code: code.to_string(),
                        children,
                    });
                }
            }
        }

        // An org-admin may still edit their own home node.
        let own_home = matches!(scope, OrgScope::Subtree { home, .. } if home == code)
            && current.is_some_and(|org| org.code == code);
        if !scope.contains_code(code) && !own_home {
            return Err(HierarchyError::OutOfScope(code.to_string()));
        }

        if self.get(code).is_some() && editing != Some(code) {
            return Err(HierarchyError::DuplicateCode(code.to_string()));
        }

        // The edited node and its subtree move along with it.
        let moving = |other: &str| match editing {
            Some(original) => other == original || self.is_below(other, original),
            None => false,
        };

        match draft.parent_code.as_deref() {
            Some(parent) => {
                if parent == code {
                    return Err(HierarchyError::SelfParent(code.to_string()));
                }
                if is_descendant_of(parent, code) {
                    return Err(HierarchyError::DescendantParent {
                        target: code.to_string(),
                        parent: parent.to_string(),
                    });
                }
                // The home node's existing parent lies outside the home scope
                // and stays acceptable as long as it is not changed.
                let keeps_parent =
                    own_home && current.and_then(|org| org.parent_code.as_deref()) == Some(parent);
                if keeps_parent {
                    self.check_parent(&OrgScope::All, editing, parent)?;
                } else {
                    self.check_parent(scope, editing, parent)?;
                }

                if !is_descendant_of(code, parent) {
                    return Err(HierarchyError::CodeNotUnderParent {
                        code: code.to_string(),
                        parent: parent.to_string(),
                    });
                }

                if let Some(existing) = self.orgs.iter().find(|other| {
                    !moving(&other.code)
                        && is_descendant_of(&other.code, parent)
                        && is_descendant_of(code, &other.code)
                }) {
                    return Err(HierarchyError::IntermediateNode {
                        code: code.to_string(),
                        parent: parent.to_string(),
                        existing: existing.code.clone(),
                    });
                }
            }
            None => {
                if let Some(existing) = self
                    .orgs
                    .iter()
                    .find(|other| !moving(&other.code) && is_descendant_of(code, &other.code))
                {
                    return Err(HierarchyError::RootUnderPrefix {
                        code: code.to_string(),
                        existing: existing.code.clone(),
                    });
                }
            }
        }

        if let Some(existing) = self
            .orgs
            .iter()
            .find(|other| !moving(&other.code) && is_descendant_of(&other.code, code))
        {
            return Err(HierarchyError::CapturesBranch {
                code: code.to_string(),
                existing: existing.code.clone(),
            });
        }

        Ok(())
    }

    /// Deleting is refused while anything still hangs beneath the node.
    pub fn check_delete(&self, code: &str) -> Result<(), HierarchyError> {
        if self.get(code).is_none() {
            return Err(HierarchyError::UnknownOrganization(code.to_string()));
        }

        let children = self.descendants_of(code).len();
        if children > 0 {
            return Err(HierarchyError::HasChildren {
                code: code.to_string(),
                children,
            });
        }

        Ok(())
    }

    /// Deletion order for an explicit cascade: deepest descendants first,
    /// the node itself last.
    pub fn cascade_order(&self, code: &str) -> Vec<&Organization> {
        let mut order = self.descendants_of(code);
        order.sort_by(|a, b| {
            let depth_a = (self.parent_chain(&a.code).len(), a.code.len());
            let depth_b = (self.parent_chain(&b.code).len(), b.code.len());
            depth_b.cmp(&depth_a).then_with(|| a.code.cmp(&b.code))
        });
        if let Some(org) = self.get(code) {
            order.push(org);
        }
        order
    }
}

/// Build the display forest straight from a flat list.
pub fn build_tree(orgs: &[Organization], membership: Membership) -> OrgForest {
    OrgHierarchy::new(orgs.to_vec()).build_tree(membership)
}
