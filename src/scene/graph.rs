use slotmap::SlotMap;

use crate::assets::ModelPrefab;
use crate::scene::{Node, NodeHandle};

/// Scene graph container.
///
/// Owns the node storage and the hierarchy operations on it. Each avatar
/// owns one graph; the graph itself has no global state.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeHandle, Node>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        self.nodes.insert(node)
    }

    pub fn add_to_parent(&mut self, child: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.nodes.insert(child);
        self.attach(handle, parent);
        handle
    }

    /// Attaches `child` under `parent`, keeping both sides of the
    /// relationship in sync. Detaches from any previous parent first.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    pub fn detach(&mut self, child: NodeHandle) {
        let Some(parent) = self.nodes.get(child).and_then(Node::parent) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
    }

    /// Removes a node and its entire subtree.
    pub fn remove_subtree(&mut self, root: NodeHandle) {
        self.detach(root);
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            if let Some(node) = self.nodes.remove(handle) {
                stack.extend(node.children);
            }
        }
    }

    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first name lookup starting at `root`.
    #[must_use]
    pub fn find_by_name(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        let node = self.nodes.get(root)?;
        if node.name == name {
            return Some(root);
        }
        for &child in &node.children {
            if let Some(found) = self.find_by_name(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Recomputes world matrices for the subtree under `root`.
    ///
    /// Children inherit `parent_world * local`; the pass is unconditional on
    /// the world side but local matrices are only rebuilt when dirty.
    pub fn update_world_transforms(&mut self, root: NodeHandle) {
        let parent_world = self
            .nodes
            .get(root)
            .and_then(Node::parent)
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.transform.world_matrix);

        let mut stack = vec![(root, parent_world)];
        while let Some((handle, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle) else {
                continue;
            };
            node.transform.update_local_matrix();
            node.transform.world_matrix = match parent_world {
                Some(pw) => pw * node.transform.local_matrix,
                None => node.transform.local_matrix,
            };
            let world = node.transform.world_matrix;
            for &child in &node.children {
                stack.push((child, Some(world)));
            }
        }
    }

    /// Instantiates a prefab subtree under `parent` and returns the handle
    /// of the instantiated root.
    pub fn instantiate(&mut self, prefab: &ModelPrefab, parent: NodeHandle) -> NodeHandle {
        let mut handles = Vec::with_capacity(prefab.nodes.len());
        for pnode in &prefab.nodes {
            let mut node = Node::new(&pnode.name);
            node.transform = pnode.transform.clone();
            handles.push(self.add_node(node));
        }
        for (i, pnode) in prefab.nodes.iter().enumerate() {
            for &child in &pnode.children {
                self.attach(handles[child], handles[i]);
            }
        }
        let root = handles[prefab.root];
        self.attach(root, parent);
        self.update_world_transforms(root);
        root
    }
}
