use crate::geometry::Aabb;
use crate::math::Vec3;

const NULL_NODE: u32 = u32::MAX;

/// Stable handle to a leaf of a [`DynamicAabbTree`].
///
/// A handle stays valid until the leaf is removed; [`DynamicAabbTree::update`]
/// keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u32);

impl ProxyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct TreeNode<T> {
    aabb: Aabb,
    parent: u32,
    left: u32,
    right: u32,
    /// Leaves are 0, internal nodes 1 + max(child heights), freed slots -1
    height: i32,
    item: Option<T>,
}

impl<T> TreeNode<T> {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.left == NULL_NODE
    }
}

/// Bounding-volume tree over axis-aligned boxes.
///
/// Leaves carry one item each. Internal nodes hold the union of their two
/// children. Nodes live in an arena; freed slots are reused before it grows.
#[derive(Debug, Clone)]
pub struct DynamicAabbTree<T> {
    nodes: Vec<TreeNode<T>>,
    root: u32,
    free_list: Vec<u32>,
    leaf_count: usize,
}

impl<T: Copy> Default for DynamicAabbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> DynamicAabbTree<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: Vec::new(),
            leaf_count: 0,
        }
    }

    /// Number of leaves
    #[inline]
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root == NULL_NODE
    }

    /// Height of the root (0 for a single leaf, -1 when empty)
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            -1
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Bounding box of the whole tree
    pub fn root_aabb(&self) -> Option<Aabb> {
        (self.root != NULL_NODE).then(|| self.nodes[self.root as usize].aabb)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = NULL_NODE;
        self.leaf_count = 0;
    }

    /// Adds a leaf holding `item` with bounds `aabb`.
    pub fn insert(&mut self, aabb: Aabb, item: T) -> ProxyId {
        let leaf = self.allocate_node(TreeNode {
            aabb,
            parent: NULL_NODE,
            left: NULL_NODE,
            right: NULL_NODE,
            height: 0,
            item: Some(item),
        });
        self.insert_leaf(leaf);
        self.leaf_count += 1;
        ProxyId(leaf)
    }

    /// Removes a leaf and returns its item.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live leaf.
    pub fn remove(&mut self, id: ProxyId) -> T {
        let item = self.leaf_item(id);
        self.remove_leaf(id.0);
        self.free_node(id.0);
        self.leaf_count -= 1;
        item
    }

    /// Moves a leaf to new bounds by detaching and reinserting it.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live leaf.
    pub fn update(&mut self, id: ProxyId, aabb: Aabb) {
        self.leaf_item(id);
        self.remove_leaf(id.0);
        self.nodes[id.index()].aabb = aabb;
        self.insert_leaf(id.0);
    }

    /// Returns the bounds and item stored at a leaf.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live leaf.
    pub fn leaf(&self, id: ProxyId) -> (Aabb, T) {
        (self.nodes[id.index()].aabb, self.leaf_item(id))
    }

    /// Visits every leaf whose box overlaps `aabb` (touching counts).
    pub fn query(&self, aabb: Aabb, mut callback: impl FnMut(ProxyId, T)) {
        if self.root == NULL_NODE {
            return;
        }

        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current as usize];
            if !node.aabb.intersects(aabb) {
                continue;
            }

            if node.is_leaf() {
                if let Some(item) = node.item {
                    callback(ProxyId(current), item);
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    /// Visits every leaf whose box the ray `origin + t * direction`,
    /// `t` in `[0, max_distance]`, passes through.
    ///
    /// The visitor returns `false` to stop early. Returns `true` when the
    /// traversal ran to completion.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mut visitor: impl FnMut(ProxyId, T, Aabb) -> bool,
    ) -> bool {
        if self.root == NULL_NODE {
            return true;
        }

        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current as usize];
            if node
                .aabb
                .ray_interval(origin, direction, max_distance)
                .is_none()
            {
                continue;
            }

            if node.is_leaf() {
                if let Some(item) = node.item {
                    if !visitor(ProxyId(current), item, node.aabb) {
                        return false;
                    }
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
        true
    }

    fn leaf_item(&self, id: ProxyId) -> T {
        let node = self
            .nodes
            .get(id.index())
            .filter(|node| node.is_leaf() && node.height == 0);
        match node.and_then(|node| node.item) {
            Some(item) => item,
            None => panic!("{id:?} is not a live leaf"),
        }
    }

    fn allocate_node(&mut self, node: TreeNode<T>) -> u32 {
        if let Some(index) = self.free_list.pop() {
            self.nodes[index as usize] = node;
            index
        } else {
            let index = self.nodes.len() as u32;
            self.nodes.push(node);
            index
        }
    }

    fn free_node(&mut self, index: u32) {
        let node = &mut self.nodes[index as usize];
        node.parent = NULL_NODE;
        node.left = NULL_NODE;
        node.right = NULL_NODE;
        node.height = -1;
        node.item = None;
        self.free_list.push(index);
    }

    /// Surface-area-heuristic descent for the sibling of a new leaf
    fn find_sibling(&self, leaf_aabb: Aabb) -> u32 {
        let mut index = self.root;

        while !self.nodes[index as usize].is_leaf() {
            let node = &self.nodes[index as usize];
            let area = node.aabb.surface_area();
            let combined_area = node.aabb.union(leaf_aabb).surface_area();

            // Cost of pairing the leaf with this node
            let cost = 2.0 * combined_area;
            // Every ancestor below here grows by at least this much
            let inheritance = 2.0 * (combined_area - area);

            let descend_cost = |child: u32| {
                let child = &self.nodes[child as usize];
                let grown = leaf_aabb.union(child.aabb).surface_area();
                if child.is_leaf() {
                    grown + inheritance
                } else {
                    grown - child.aabb.surface_area() + inheritance
                }
            };
            let cost_left = descend_cost(node.left);
            let cost_right = descend_cost(node.right);

            if cost < cost_left && cost < cost_right {
                break;
            }
            index = if cost_left < cost_right {
                node.left
            } else {
                node.right
            };
        }

        index
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let sibling = self.find_sibling(leaf_aabb);
        let old_parent = self.nodes[sibling as usize].parent;

        let new_parent = self.allocate_node(TreeNode {
            aabb: leaf_aabb.union(self.nodes[sibling as usize].aabb),
            parent: old_parent,
            left: sibling,
            right: leaf,
            height: self.nodes[sibling as usize].height + 1,
            item: None,
        });
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        if old_parent == NULL_NODE {
            self.root = new_parent;
        } else {
            let parent = &mut self.nodes[old_parent as usize];
            if parent.left == sibling {
                parent.left = new_parent;
            } else {
                parent.right = new_parent;
            }
        }

        self.fix_upwards(old_parent);
    }

    /// Detaches a leaf, splicing its parent out. The leaf slot stays allocated.
    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grandparent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].left == leaf {
            self.nodes[parent as usize].right
        } else {
            self.nodes[parent as usize].left
        };

        if grandparent == NULL_NODE {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
        } else {
            let gp = &mut self.nodes[grandparent as usize];
            if gp.left == parent {
                gp.left = sibling;
            } else {
                gp.right = sibling;
            }
            self.nodes[sibling as usize].parent = grandparent;
        }

        self.nodes[leaf as usize].parent = NULL_NODE;
        self.free_node(parent);
        self.fix_upwards(grandparent);
    }

    /// Recomputes boxes and heights from `start` to the root
    fn fix_upwards(&mut self, start: u32) {
        let mut index = start;
        while index != NULL_NODE {
            let (left, right) = {
                let node = &self.nodes[index as usize];
                (node.left, node.right)
            };
            let (left, right) = (&self.nodes[left as usize], &self.nodes[right as usize]);
            let aabb = left.aabb.union(right.aabb);
            let height = 1 + left.height.max(right.height);

            let node = &mut self.nodes[index as usize];
            node.aabb = aabb;
            node.height = height;
            index = node.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::from_center_half_extents(center, Vec3::splat(half))
    }

    /// Walks the live tree and checks every structural invariant
    fn validate<T: Copy>(tree: &DynamicAabbTree<T>) {
        if tree.root == NULL_NODE {
            assert_eq!(tree.leaf_count, 0);
            assert_eq!(tree.free_list.len(), tree.nodes.len());
            return;
        }
        assert_eq!(tree.nodes[tree.root as usize].parent, NULL_NODE);

        let mut live = 0;
        let mut leaves = 0;
        let mut stack = vec![tree.root];
        while let Some(index) = stack.pop() {
            live += 1;
            assert!(!tree.free_list.contains(&index), "live node {index} is on the free list");
            let node = &tree.nodes[index as usize];

            if node.is_leaf() {
                leaves += 1;
                assert_eq!(node.height, 0);
                assert!(node.item.is_some());
                continue;
            }

            let (l, r) = (&tree.nodes[node.left as usize], &tree.nodes[node.right as usize]);
            assert_eq!(l.parent, index);
            assert_eq!(r.parent, index);
            assert_eq!(node.aabb, l.aabb.union(r.aabb));
            assert_eq!(node.height, 1 + l.height.max(r.height));
            assert!(node.item.is_none());
            stack.push(node.left);
            stack.push(node.right);
        }

        assert_eq!(leaves, tree.leaf_count);
        assert_eq!(live + tree.free_list.len(), tree.nodes.len());
    }

    /// In-order leaf items with their boxes
    fn snapshot(tree: &DynamicAabbTree<u32>) -> Vec<(u32, Aabb)> {
        fn walk(tree: &DynamicAabbTree<u32>, index: u32, out: &mut Vec<(u32, Aabb)>) {
            let node = &tree.nodes[index as usize];
            if node.is_leaf() {
                out.push((node.item.unwrap(), node.aabb));
            } else {
                walk(tree, node.left, out);
                walk(tree, node.right, out);
            }
        }
        let mut out = Vec::new();
        if tree.root != NULL_NODE {
            walk(tree, tree.root, &mut out);
        }
        out
    }

    #[test]
    fn test_empty_tree() {
        let tree: DynamicAabbTree<u32> = DynamicAabbTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), -1);

        let mut hits = 0;
        tree.query(cube(Vec3::ZERO, 100.0), |_, _| hits += 1);
        assert_eq!(hits, 0);
        assert!(tree.raycast(Vec3::ZERO, Vec3::X, 10.0, |_, _, _| true));
    }

    #[test]
    fn test_insert_and_query() {
        let mut tree = DynamicAabbTree::new();
        tree.insert(cube(Vec3::ZERO, 1.0), 0u32);
        tree.insert(cube(Vec3::new(5.0, 0.0, 0.0), 1.0), 1);
        tree.insert(cube(Vec3::new(10.0, 0.0, 0.0), 1.0), 2);
        validate(&tree);

        let mut found = Vec::new();
        tree.query(cube(Vec3::new(4.0, 0.0, 0.0), 0.5), |_, item| found.push(item));
        assert_eq!(found, vec![1]);
        assert_eq!(tree.len(), 3);
        assert!(tree.height() >= 1);
    }

    #[test]
    fn test_remove_root_clears_tree() {
        let mut tree = DynamicAabbTree::new();
        let id = tree.insert(cube(Vec3::ZERO, 1.0), 7u32);
        assert_eq!(tree.remove(id), 7);
        assert!(tree.is_empty());
        validate(&tree);
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let mut tree = DynamicAabbTree::new();
        let ids: Vec<_> = (0..4)
            .map(|i| tree.insert(cube(Vec3::new(i as f32 * 3.0, 0.0, 0.0), 1.0), i))
            .collect();
        let arena = tree.nodes.len();

        tree.remove(ids[1]);
        tree.insert(cube(Vec3::new(20.0, 0.0, 0.0), 1.0), 9);
        assert_eq!(tree.nodes.len(), arena);
        validate(&tree);
    }

    #[test]
    fn test_update_keeps_handle() {
        let mut tree = DynamicAabbTree::new();
        let a = tree.insert(cube(Vec3::ZERO, 1.0), 0u32);
        let b = tree.insert(cube(Vec3::new(3.0, 0.0, 0.0), 1.0), 1);
        tree.insert(cube(Vec3::new(6.0, 0.0, 0.0), 1.0), 2);

        let moved = cube(Vec3::new(-10.0, 0.0, 0.0), 1.0);
        tree.update(b, moved);
        validate(&tree);

        assert_eq!(tree.leaf(b), (moved, 1));
        assert_eq!(tree.leaf(a).1, 0);

        let mut found = Vec::new();
        tree.query(cube(Vec3::new(-10.0, 0.0, 0.0), 0.1), |id, _| found.push(id));
        assert_eq!(found, vec![b]);
    }

    #[test]
    fn test_insert_remove_round_trip() {
        let mut tree = DynamicAabbTree::new();
        for i in 0..6u32 {
            let center = Vec3::new(i as f32 * 2.0, (i % 2) as f32, 0.0);
            tree.insert(cube(center, 0.75), i);
        }
        let before = snapshot(&tree);
        let root_box = tree.root_aabb();
        let height = tree.height();

        let id = tree.insert(cube(Vec3::new(3.0, 4.0, 1.0), 0.5), 99);
        tree.remove(id);

        assert_eq!(snapshot(&tree), before);
        assert_eq!(tree.root_aabb(), root_box);
        assert_eq!(tree.height(), height);
        validate(&tree);
    }

    #[test]
    fn test_raycast_visits_hit_leaves_and_stops() {
        let mut tree = DynamicAabbTree::new();
        for i in 0..5u32 {
            tree.insert(cube(Vec3::new(i as f32 * 4.0, 0.0, 0.0), 1.0), i);
        }
        tree.insert(cube(Vec3::new(0.0, 10.0, 0.0), 1.0), 100);

        let mut hits = Vec::new();
        let completed = tree.raycast(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, 12.0, |_, item, _| {
            hits.push(item);
            true
        });
        hits.sort_unstable();
        assert!(completed);
        // Boxes at x = 0 and 4 start within 12 units; x = 8 starts at 12
        assert_eq!(hits, vec![0, 1, 2]);

        let mut visits = 0;
        let completed = tree.raycast(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, 100.0, |_, _, _| {
            visits += 1;
            false
        });
        assert!(!completed);
        assert_eq!(visits, 1);
    }

    #[test]
    #[should_panic]
    fn test_remove_stale_proxy_panics() {
        let mut tree = DynamicAabbTree::new();
        let id = tree.insert(cube(Vec3::ZERO, 1.0), 0u32);
        tree.insert(cube(Vec3::ONE, 1.0), 1u32);
        tree.remove(id);
        tree.remove(id);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(Vec3, f32),
        Remove(usize),
        Update(usize, Vec3, f32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let center = (-50.0f32..50.0, -50.0f32..50.0, -50.0f32..50.0)
            .prop_map(|(x, y, z)| Vec3::new(x, y, z));
        prop_oneof![
            3 => (center.clone(), 0.1f32..5.0).prop_map(|(c, h)| Op::Insert(c, h)),
            1 => any::<usize>().prop_map(Op::Remove),
            2 => (any::<usize>(), center, 0.1f32..5.0).prop_map(|(i, c, h)| Op::Update(i, c, h)),
        ]
    }

    #[test]
    fn test_random_operations_match_brute_force() {
        let config = Config {
            cases: 64,
            failure_persistence: None,
            ..Config::default()
        };
        // Fixed seed keeps failures reproducible across runs
        let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &[7u8; 32]);
        let mut runner = TestRunner::new_with_rng(config, rng);

        let strategy = (
            prop::collection::vec(op_strategy(), 1..120),
            (-50.0f32..50.0, -50.0f32..50.0, -50.0f32..50.0),
            1.0f32..20.0,
        );

        runner
            .run(&strategy, |(ops, (qx, qy, qz), qh)| {
                let mut tree = DynamicAabbTree::new();
                let mut live: Vec<(ProxyId, u32, Aabb)> = Vec::new();
                let mut next_item = 0u32;

                for op in ops {
                    match op {
                        Op::Insert(c, h) => {
                            let aabb = cube(c, h);
                            let id = tree.insert(aabb, next_item);
                            live.push((id, next_item, aabb));
                            next_item += 1;
                        }
                        Op::Remove(i) if !live.is_empty() => {
                            let (id, item, _) = live.swap_remove(i % live.len());
                            prop_assert_eq!(tree.remove(id), item);
                        }
                        Op::Update(i, c, h) if !live.is_empty() => {
                            let slot = i % live.len();
                            let aabb = cube(c, h);
                            tree.update(live[slot].0, aabb);
                            live[slot].2 = aabb;
                        }
                        _ => {}
                    }
                    validate(&tree);
                }

                let query = cube(Vec3::new(qx, qy, qz), qh);
                let mut found = Vec::new();
                tree.query(query, |_, item| found.push(item));
                found.sort_unstable();

                let mut expected: Vec<u32> = live
                    .iter()
                    .filter(|(_, _, aabb)| aabb.intersects(query))
                    .map(|(_, item, _)| *item)
                    .collect();
                expected.sort_unstable();

                prop_assert_eq!(found, expected);
                prop_assert_eq!(tree.len(), live.len());
                Ok(())
            })
            .unwrap();
    }
}
