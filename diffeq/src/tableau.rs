/// Coefficients of an explicit Runge-Kutta method, optionally with an embedded pair for
/// error estimation.
#[derive(Clone, Copy, Debug)]
pub struct ButcherTableau<const STAGES: usize> {
    pub name: &'static str,
    pub a: [[f64; STAGES]; STAGES],
    /// Weights of the propagated solution.
    pub b: [f64; STAGES],
    /// Weights of the embedded solution used for error estimation.
    pub b2: Option<[f64; STAGES]>,
    pub c: [f64; STAGES],
    /// Order of the propagated solution.
    pub order: usize,
    /// Order of the embedded error estimate, used as the step control exponent.
    pub error_order: Option<usize>,
    /// First same as last: the final stage is the derivative at the end of the step.
    pub fsal: bool,
}

impl ButcherTableau<4> {
    // usage is ButcherTableau::<4>::RK4
    pub const RK4: Self = Self {
        name: "RK4",
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 1. / 2., 0., 0.],
            [0., 0., 1., 0.],
        ],
        b: [1. / 6., 1. / 3., 1. / 3., 1. / 6.],
        b2: None,
        c: [0., 1.0 / 2.0, 1.0 / 2.0, 1.0],
        order: 4,
        error_order: None,
        fsal: false,
    };

    pub const BOGACKISHAMPINE32: Self = Self {
        name: "Bogacki-Shampine 3(2)",
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 3. / 4., 0., 0.],
            [2. / 9., 1. / 3., 4. / 9., 0.],
        ],
        b: [2. / 9., 1. / 3., 4. / 9., 0.],
        b2: Some([7. / 24., 1. / 4., 1. / 3., 1. / 8.]),
        c: [0., 1. / 2., 3. / 4., 1.],
        order: 3,
        error_order: Some(2),
        fsal: true,
    };
}

impl ButcherTableau<7> {
    // usage is ButcherTableau::<7>::DORMANDPRINCE45
    pub const DORMANDPRINCE45: Self = Self {
        name: "Dormand-Prince 5(4)",
        a: [
            [0., 0., 0., 0., 0., 0., 0.],
            [1. / 5., 0., 0., 0., 0., 0., 0.],
            [3. / 40., 9. / 40., 0., 0., 0., 0., 0.],
            [44. / 45., -56. / 15., 32. / 9., 0., 0., 0., 0.],
            [
                19372. / 6561.,
                -25360. / 2187.,
                64448. / 6561.,
                -212. / 729.,
                0.,
                0.,
                0.,
            ],
            [
                9017. / 3168.,
                -355. / 33.,
                46732. / 5247.,
                49. / 176.,
                -5103. / 18656.,
                0.,
                0.,
            ],
            [
                35. / 384.,
                0.,
                500. / 1113.,
                125. / 192.,
                -2187. / 6784.,
                11. / 84.,
                0.,
            ],
        ],
        b: [
            35. / 384.,
            0.,
            500. / 1113.,
            125. / 192.,
            -2187. / 6784.,
            11. / 84.,
            0.,
        ],
        b2: Some([
            5179. / 57600.,
            0.,
            7571. / 16695.,
            393. / 640.,
            -92097. / 339200.,
            187. / 2100.,
            1. / 40.,
        ]),
        c: [0., 1. / 5., 3. / 10., 4. / 5., 8. / 9., 1.0, 1.0],
        order: 5,
        error_order: Some(4),
        fsal: true,
    };
}
