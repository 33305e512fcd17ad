/// Per-district sets of boundary nodes, with O(1) membership updates.
///
/// A node is kept in at most one set (its own district's). Backing
/// vectors use swap-removal, so set order is arbitrary.
#[derive(Debug, Clone)]
pub(crate) struct BoundarySets {
    sets: Vec<Vec<usize>>,
    index: Vec<Option<(u32, u32)>>, // index[node] = Some((district, pos)) when present
}

impl BoundarySets {
    /// Create empty boundary sets for districts `0..num_sets` over
    /// `num_nodes` nodes.
    pub(crate) fn new(num_sets: usize, num_nodes: usize) -> Self {
        Self {
            sets: vec![Vec::new(); num_sets],
            index: vec![None; num_nodes],
        }
    }

    /// Read-only view of the boundary nodes of a district.
    #[inline]
    pub(crate) fn get(&self, district: u32) -> &[usize] {
        &self.sets[district as usize]
    }

    /// Returns true if the node is currently recorded on any boundary.
    #[inline]
    pub(crate) fn contains(&self, node: usize) -> bool {
        self.index[node].is_some()
    }

    /// Record `node` as a boundary node of `district` when
    /// `on_boundary`, otherwise drop it; moves it between sets if its
    /// district changed.
    pub(crate) fn refresh(&mut self, node: usize, district: u32, on_boundary: bool) {
        if !on_boundary { return self.remove(node) }
        match self.index[node] {
            Some((current, _)) if current == district => {}
            Some(_) => { self.remove(node); self.insert(node, district); }
            None => self.insert(node, district),
        }
    }

    fn insert(&mut self, node: usize, district: u32) {
        let set = &mut self.sets[district as usize];
        self.index[node] = Some((district, set.len() as u32));
        set.push(node);
    }

    fn remove(&mut self, node: usize) {
        if let Some((district, pos)) = self.index[node].take() {
            let set = &mut self.sets[district as usize];
            let last = set.pop().unwrap();
            if (pos as usize) < set.len() {
                set[pos as usize] = last;
                self.index[last] = Some((district, pos));
            }
        }
    }
}
