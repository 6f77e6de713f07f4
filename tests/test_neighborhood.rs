use approx::assert_relative_eq;
use nalgebra::Vector3;
use neighbors_rs::{NeighborError, Neighborhood};

const MOLECULE: [[f64; 3]; 26] = [
    [-1.5365e+00, 2.4770e-01, 0.0000e+00],
    [-4.1670e-01, 2.4770e-01, 0.0000e+00],
    [-1.8828e+00, 1.3126e+00, 0.0000e+00],
    [-2.0532e+00, -4.6390e-01, 1.2468e+00],
    [-1.6724e+00, 6.0500e-02, 2.1630e+00],
    [-2.0535e+00, -4.6410e-01, -1.2466e+00],
    [-1.6729e+00, 6.0100e-02, -2.1629e+00],
    [-1.5637e+00, -1.9090e+00, -1.2451e+00],
    [-4.4420e-01, -1.9302e+00, -1.2577e+00],
    [-1.9302e+00, -2.4348e+00, -2.1634e+00],
    [-1.5634e+00, -1.9089e+00, 1.2454e+00],
    [-1.9296e+00, -2.4345e+00, 2.1638e+00],
    [-4.4390e-01, -1.9300e+00, 1.2576e+00],
    [-2.0803e+00, -2.6231e+00, 3.0000e-04],
    [-1.7195e+00, -3.6858e+00, 3.0000e-04],
    [-3.6059e+00, -2.6024e+00, 4.0000e-04],
    [-3.9927e+00, -3.1350e+00, -9.0540e-01],
    [-3.9924e+00, -3.1349e+00, 9.0650e-01],
    [-3.5788e+00, -4.4570e-01, 1.2456e+00],
    [-3.9456e+00, 6.1220e-01, 1.2580e+00],
    [-3.9650e+00, -9.5680e-01, 2.1640e+00],
    [-3.5791e+00, -4.4580e-01, -1.2449e+00],
    [-3.9458e+00, 6.1220e-01, -1.2572e+00],
    [-3.9656e+00, -9.5680e-01, -2.1632e+00],
    [-4.0980e+00, -1.1582e+00, 4.0000e-04],
    [-5.2201e+00, -1.1442e+00, 6.0000e-04],
];

const CRYSTAL: [[f64; 3]; 18] = [
    [0.60421912, 4.2840792, 0.67433509],
    [-0.69258171, 3.9731936, 3.49208748],
    [0.32811792, 4.34729737, 6.48343793],
    [4.88477572, 1.81537674, 6.26972558],
    [6.14499816, 1.48505734, 3.37312786],
    [5.12754047, 1.85762907, 0.43572421],
    [2.09507387, 3.66872721, 0.39353504],
    [0.5848138, 0.91854645, 0.28564143],
    [0.33364169, 4.10698461, 2.26790994],
    [-1.14582521, 2.41879964, 3.57784907],
    [0.06571752, 4.4286596, 4.80486228],
    [3.78132323, 0.96146537, 0.19503846],
    [3.29078661, 1.21859679, 6.60654731],
    [4.93953611, 3.49170736, 6.71444093],
    [5.15070623, 1.63464631, 4.60290757],
    [6.60903043, 4.89706872, 3.2209702],
    [5.36681478, 1.95057166, 2.05143108],
    [1.73241622, 3.38087446, 6.78291188],
];

const LATTICE: [[f64; 3]; 3] = [
    [8.60700000e+00, 0.00000000e+00, 0.00000000e+00],
    [8.64636107e-04, 4.95399992e+00, 0.00000000e+00],
    [-3.14318359e+00, 1.38078488e-02, 6.91625732e+00],
];

fn crystal() -> Neighborhood {
    let mut nh = Neighborhood::new();
    nh.update(CRYSTAL.iter().enumerate().map(|(i, &p)| (i + 1, p)));
    nh.set_lattice(LATTICE).unwrap();
    nh
}

#[test]
fn test_update_moves_points() {
    let mut nh = Neighborhood::new();
    // keys count from 1
    nh.update(MOLECULE.iter().enumerate().map(|(i, &p)| (i + 1, p)));
    assert_eq!(nh.npoints(), 26);

    assert_eq!(nh.neighbors(8, 1.5).unwrap().len(), 2);
    assert_eq!(nh.neighbors(8, 1.6).unwrap().len(), 4);

    // move point 9 away from 8: distance(8--9) = 2.05
    let p9 = [0.4858028, -1.9478115, -1.2681672];
    nh.update([(9, p9)]);
    assert_eq!(nh.npoints(), 26);
    assert_eq!(nh.get_position(9), Some(p9));
    assert_eq!(nh.neighbors(8, 1.5).unwrap().len(), 1);
    assert_eq!(nh.neighbors(8, 1.6).unwrap().len(), 3);

    // points near an arbitrary location, the point there included
    assert_eq!(nh.search(p9, 2.0).unwrap().len(), 1);
    assert_eq!(nh.search(p9, 2.2).unwrap().len(), 2);
}

#[test]
fn test_unknown_node() {
    let mut nh = Neighborhood::new();
    nh.update(MOLECULE.iter().enumerate().map(|(i, &p)| (i + 1, p)));
    assert_eq!(nh.neighbors(0, 1.5), Err(NeighborError::UnknownNode(0)));
}

#[test]
fn test_periodic_neighbors() {
    let nh = crystal();
    let mut neighbors = nh.neighbors(1, 1.8).unwrap();
    neighbors.sort_by_key(|n| n.node);

    let nodes: Vec<_> = neighbors.iter().map(|n| n.node).collect();
    assert_eq!(nodes, vec![7, 8, 9, 14]);

    let images: Vec<_> = neighbors.iter().map(|n| n.image.unwrap()).collect();
    let expected = vec![
        Vector3::new(0, 0, 0),   // node 7
        Vector3::new(0, 1, 0),   // node 8
        Vector3::new(0, 0, 0),   // node 9
        Vector3::new(-1, 0, -1), // node 14
    ];
    assert_eq!(images, expected);

    // reported distances are to the image, not to the stored point
    let cell = nh.lattice().unwrap();
    for n in &neighbors {
        let p = Vector3::from(nh.get_position(n.node).unwrap())
            + cell.image_translation(&n.image.unwrap());
        let d = (p - Vector3::from(CRYSTAL[0])).norm();
        assert_relative_eq!(n.distance, d, epsilon = 1e-9);
    }
}

#[test]
fn test_periodic_counts() {
    let nh = crystal();
    let counts: Vec<usize> = (1..=18).map(|k| nh.neighbors(k, 1.8).unwrap().len()).collect();
    let mut expected = vec![4; 6];
    expected.extend(vec![2; 12]);
    assert_eq!(counts, expected);

    // a larger radius afterwards rebuilds the cached image tree
    assert_eq!(nh.neighbors(1, 4.0).unwrap().len(), 15);
    assert_eq!(nh.neighbors(1, 1.8).unwrap().len(), 4);
}
