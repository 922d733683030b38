pub mod org_hierarchy;
pub mod role_resolver;

pub use org_hierarchy::{
    HierarchyError, Membership, OrgForest, OrgHierarchy, OrgScope, OrgTreeNode, build_tree,
    is_descendant_of, visible_scope,
};
pub use role_resolver::{
    EditFlow, EditScreen, EditState, FlowError, RoleResolver, assignable_role_levels,
    check_role_assignment,
};
