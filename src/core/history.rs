use serde::Serialize;

/// One calendar year of recorded market history. All fields are signed fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyReturn {
    pub year: u16,
    pub equity_return: f64,
    pub bond_return: f64,
    pub inflation: f64,
}

impl YearlyReturn {
    pub const fn new(year: u16, equity_return: f64, bond_return: f64, inflation: f64) -> Self {
        Self {
            year,
            equity_return,
            bond_return,
            inflation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub first_year: u16,
    pub last_year: u16,
    pub years: usize,
    pub mean_equity_return: f64,
    pub mean_bond_return: f64,
    pub mean_inflation: f64,
}

pub fn summarize(history: &[YearlyReturn]) -> Option<HistorySummary> {
    let first = history.first()?;
    let last = history.last()?;
    let n = history.len() as f64;
    let mean = |field: fn(&YearlyReturn) -> f64| history.iter().map(field).sum::<f64>() / n;

    Some(HistorySummary {
        first_year: first.year,
        last_year: last.year,
        years: history.len(),
        mean_equity_return: mean(|r| r.equity_return),
        mean_bond_return: mean(|r| r.bond_return),
        mean_inflation: mean(|r| r.inflation),
    })
}

// US annual figures: S&P 500 total return, 10-year Treasury total return,
// CPI-U December over December.
pub static US_HISTORY: &[YearlyReturn] = &[
    YearlyReturn::new(1928, 0.4381, 0.0084, -0.0097),
    YearlyReturn::new(1929, -0.0830, 0.0420, 0.0020),
    YearlyReturn::new(1930, -0.2512, 0.0454, -0.0603),
    YearlyReturn::new(1931, -0.4384, -0.0256, -0.0952),
    YearlyReturn::new(1932, -0.0864, 0.0879, -0.1030),
    YearlyReturn::new(1933, 0.4998, 0.0186, 0.0051),
    YearlyReturn::new(1934, -0.0119, 0.0796, 0.0203),
    YearlyReturn::new(1935, 0.4674, 0.0447, 0.0299),
    YearlyReturn::new(1936, 0.3194, 0.0502, 0.0121),
    YearlyReturn::new(1937, -0.3534, 0.0138, 0.0310),
    YearlyReturn::new(1938, 0.2928, 0.0421, -0.0278),
    YearlyReturn::new(1939, -0.0110, 0.0441, -0.0048),
    YearlyReturn::new(1940, -0.1067, 0.0540, 0.0096),
    YearlyReturn::new(1941, -0.1277, -0.0202, 0.0972),
    YearlyReturn::new(1942, 0.1917, 0.0229, 0.0929),
    YearlyReturn::new(1943, 0.2506, 0.0249, 0.0316),
    YearlyReturn::new(1944, 0.1903, 0.0258, 0.0211),
    YearlyReturn::new(1945, 0.3582, 0.0380, 0.0225),
    YearlyReturn::new(1946, -0.0843, 0.0313, 0.1817),
    YearlyReturn::new(1947, 0.0520, 0.0092, 0.0901),
    YearlyReturn::new(1948, 0.0570, 0.0195, 0.0271),
    YearlyReturn::new(1949, 0.1830, 0.0466, -0.0180),
    YearlyReturn::new(1950, 0.3081, 0.0043, 0.0579),
    YearlyReturn::new(1951, 0.2368, -0.0030, 0.0587),
    YearlyReturn::new(1952, 0.1815, 0.0227, 0.0088),
    YearlyReturn::new(1953, -0.0121, 0.0414, 0.0062),
    YearlyReturn::new(1954, 0.5256, 0.0329, -0.0050),
    YearlyReturn::new(1955, 0.3260, -0.0134, 0.0037),
    YearlyReturn::new(1956, 0.0744, -0.0226, 0.0286),
    YearlyReturn::new(1957, -0.1046, 0.0680, 0.0302),
    YearlyReturn::new(1958, 0.4372, -0.0210, 0.0176),
    YearlyReturn::new(1959, 0.1206, -0.0265, 0.0150),
    YearlyReturn::new(1960, 0.0034, 0.1164, 0.0148),
    YearlyReturn::new(1961, 0.2664, 0.0206, 0.0067),
    YearlyReturn::new(1962, -0.0881, 0.0569, 0.0122),
    YearlyReturn::new(1963, 0.2261, 0.0168, 0.0165),
    YearlyReturn::new(1964, 0.1642, 0.0373, 0.0119),
    YearlyReturn::new(1965, 0.1240, 0.0072, 0.0192),
    YearlyReturn::new(1966, -0.0997, 0.0291, 0.0335),
    YearlyReturn::new(1967, 0.2380, -0.0158, 0.0304),
    YearlyReturn::new(1968, 0.1081, 0.0327, 0.0472),
    YearlyReturn::new(1969, -0.0824, -0.0501, 0.0611),
    YearlyReturn::new(1970, 0.0356, 0.1675, 0.0549),
    YearlyReturn::new(1971, 0.1422, 0.0979, 0.0336),
    YearlyReturn::new(1972, 0.1876, 0.0282, 0.0341),
    YearlyReturn::new(1973, -0.1431, 0.0366, 0.0880),
    YearlyReturn::new(1974, -0.2590, 0.0199, 0.1220),
    YearlyReturn::new(1975, 0.3700, 0.0361, 0.0701),
    YearlyReturn::new(1976, 0.2383, 0.1598, 0.0481),
    YearlyReturn::new(1977, -0.0698, 0.0129, 0.0677),
    YearlyReturn::new(1978, 0.0651, -0.0078, 0.0903),
    YearlyReturn::new(1979, 0.1852, 0.0067, 0.1331),
    YearlyReturn::new(1980, 0.3174, -0.0299, 0.1240),
    YearlyReturn::new(1981, -0.0470, 0.0820, 0.0894),
    YearlyReturn::new(1982, 0.2042, 0.3281, 0.0387),
    YearlyReturn::new(1983, 0.2234, 0.0320, 0.0380),
    YearlyReturn::new(1984, 0.0615, 0.1373, 0.0395),
    YearlyReturn::new(1985, 0.3124, 0.2571, 0.0377),
    YearlyReturn::new(1986, 0.1849, 0.2428, 0.0113),
    YearlyReturn::new(1987, 0.0581, -0.0496, 0.0441),
    YearlyReturn::new(1988, 0.1654, 0.0822, 0.0442),
    YearlyReturn::new(1989, 0.3148, 0.1769, 0.0465),
    YearlyReturn::new(1990, -0.0306, 0.0624, 0.0611),
    YearlyReturn::new(1991, 0.3023, 0.1500, 0.0306),
    YearlyReturn::new(1992, 0.0749, 0.0936, 0.0290),
    YearlyReturn::new(1993, 0.0997, 0.1421, 0.0275),
    YearlyReturn::new(1994, 0.0133, -0.0804, 0.0267),
    YearlyReturn::new(1995, 0.3720, 0.2348, 0.0254),
    YearlyReturn::new(1996, 0.2268, 0.0143, 0.0332),
    YearlyReturn::new(1997, 0.3310, 0.0994, 0.0170),
    YearlyReturn::new(1998, 0.2834, 0.1492, 0.0161),
    YearlyReturn::new(1999, 0.2089, -0.0825, 0.0268),
    YearlyReturn::new(2000, -0.0903, 0.1666, 0.0339),
    YearlyReturn::new(2001, -0.1185, 0.0557, 0.0155),
    YearlyReturn::new(2002, -0.2197, 0.1512, 0.0238),
    YearlyReturn::new(2003, 0.2836, 0.0038, 0.0188),
    YearlyReturn::new(2004, 0.1074, 0.0449, 0.0326),
    YearlyReturn::new(2005, 0.0483, 0.0287, 0.0342),
    YearlyReturn::new(2006, 0.1561, 0.0196, 0.0254),
    YearlyReturn::new(2007, 0.0548, 0.1021, 0.0408),
    YearlyReturn::new(2008, -0.3655, 0.2010, 0.0009),
    YearlyReturn::new(2009, 0.2594, -0.1112, 0.0272),
    YearlyReturn::new(2010, 0.1482, 0.0846, 0.0150),
    YearlyReturn::new(2011, 0.0210, 0.1604, 0.0296),
    YearlyReturn::new(2012, 0.1589, 0.0297, 0.0174),
    YearlyReturn::new(2013, 0.3215, -0.0910, 0.0150),
    YearlyReturn::new(2014, 0.1352, 0.1075, 0.0076),
    YearlyReturn::new(2015, 0.0138, 0.0128, 0.0073),
    YearlyReturn::new(2016, 0.1177, 0.0069, 0.0207),
    YearlyReturn::new(2017, 0.2161, 0.0280, 0.0211),
    YearlyReturn::new(2018, -0.0423, -0.0002, 0.0191),
    YearlyReturn::new(2019, 0.3121, 0.0964, 0.0229),
    YearlyReturn::new(2020, 0.1802, 0.1133, 0.0136),
    YearlyReturn::new(2021, 0.2847, -0.0442, 0.0704),
    YearlyReturn::new(2022, -0.1804, -0.1783, 0.0645),
    YearlyReturn::new(2023, 0.2606, 0.0388, 0.0335),
];
