use neighbors_rs::{EdgeList, build_neighborlists};

#[test]
fn test_edge_list_layout() {
    // Three atoms in a row, 1.0 apart: two edges below 1.5
    let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
    let result: EdgeList = build_neighborlists(&positions, 1.5, None, false).unwrap();

    // edge_index is [sources..., targets...], shifts is [x, y, z] per edge
    assert_eq!(result.edge_index.len(), 2 * result.num_edges());
    assert_eq!(result.shifts.len(), 3 * result.num_edges());
    assert_eq!(result.sources().len(), result.targets().len());
    for (s, t) in result.sources().iter().zip(result.targets()) {
        assert!(s < t);
    }
}

#[test]
fn test_empty_input() {
    let result = build_neighborlists(&[], 2.0, None, true).unwrap();
    assert_eq!(result, EdgeList::default());
}
