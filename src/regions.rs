//! Two-level region catalogue (region, district) with forecast coordinates
//!
//! Selecting the district [`ALL_DISTRICTS`] (or none) resolves to the
//! region's representative point.

use std::sync::LazyLock;

use crate::models::LocationCoordinate;
use crate::{Result, StyleError};

/// District name meaning "the whole region"
pub const ALL_DISTRICTS: &str = "전체";

/// A point with both KMA grid and lat/lon coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: &'static str,
    pub nx: u16,
    pub ny: u16,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: &'static str,
    /// Romanized name accepted on the command line
    pub alias: &'static str,
    pub representative: Site,
    pub districts: Vec<Site>,
}

/// A resolved region selection
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSite {
    pub label: String,
    pub site: &'static Site,
}

impl RegionSite {
    #[must_use]
    pub fn grid_location(&self) -> LocationCoordinate {
        LocationCoordinate::grid(self.label.clone(), self.site.nx, self.site.ny)
    }

    #[must_use]
    pub fn lat_lon_location(&self) -> LocationCoordinate {
        LocationCoordinate::lat_lon(self.label.clone(), self.site.latitude, self.site.longitude)
    }
}

const fn site(name: &'static str, nx: u16, ny: u16, latitude: f64, longitude: f64) -> Site {
    Site {
        name,
        nx,
        ny,
        latitude,
        longitude,
    }
}

static REGIONS: LazyLock<Vec<Region>> = LazyLock::new(|| {
    vec![
        Region {
            name: "서울",
            alias: "seoul",
            representative: site("서울", 60, 127, 37.5665, 126.9780),
            districts: vec![
                site("강남구", 61, 126, 37.5172, 127.0473),
                site("종로구", 60, 127, 37.5735, 126.9790),
                site("마포구", 59, 127, 37.5663, 126.9019),
                site("송파구", 62, 126, 37.5145, 127.1059),
            ],
        },
        Region {
            name: "부산",
            alias: "busan",
            representative: site("부산", 98, 76, 35.1796, 129.0756),
            districts: vec![
                site("해운대구", 99, 75, 35.1631, 129.1636),
                site("부산진구", 97, 75, 35.1628, 129.0532),
            ],
        },
        Region {
            name: "인천",
            alias: "incheon",
            representative: site("인천", 55, 124, 37.4563, 126.7052),
            districts: vec![],
        },
        Region {
            name: "대구",
            alias: "daegu",
            representative: site("대구", 89, 91, 35.8714, 128.6014),
            districts: vec![],
        },
        Region {
            name: "광주",
            alias: "gwangju",
            representative: site("광주", 58, 74, 35.1595, 126.8526),
            districts: vec![],
        },
        Region {
            name: "대전",
            alias: "daejeon",
            representative: site("대전", 67, 100, 36.3504, 127.3845),
            districts: vec![],
        },
        Region {
            name: "울산",
            alias: "ulsan",
            representative: site("울산", 102, 84, 35.5384, 129.3114),
            districts: vec![],
        },
        Region {
            name: "세종",
            alias: "sejong",
            representative: site("세종", 66, 103, 36.4800, 127.2890),
            districts: vec![],
        },
        Region {
            name: "경기",
            alias: "gyeonggi",
            representative: site("수원시", 61, 120, 37.2636, 127.0286),
            districts: vec![
                site("성남시", 62, 124, 37.4201, 127.1262),
                site("고양시", 57, 129, 37.6584, 126.8320),
            ],
        },
        Region {
            name: "강원",
            alias: "gangwon",
            representative: site("춘천시", 73, 134, 37.8813, 127.7298),
            districts: vec![site("강릉시", 92, 132, 37.7519, 128.8761)],
        },
        Region {
            name: "제주",
            alias: "jeju",
            representative: site("제주시", 53, 38, 33.4996, 126.5312),
            districts: vec![site("서귀포시", 53, 33, 33.2541, 126.5600)],
        },
    ]
});

/// All regions in display order
#[must_use]
pub fn regions() -> &'static [Region] {
    &REGIONS
}

/// Find a region by Korean name or romanized alias
pub fn find_region(name: &str) -> Result<&'static Region> {
    let needle = name.trim();
    regions()
        .iter()
        .find(|r| r.name == needle || r.alias.eq_ignore_ascii_case(needle))
        .ok_or_else(|| {
            StyleError::validation(format!(
                "Unknown region '{needle}'. Known regions: {}",
                regions()
                    .iter()
                    .map(|r| r.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

/// Resolve a region selection to a site
pub fn resolve(region: &str, district: Option<&str>) -> Result<RegionSite> {
    let region = find_region(region)?;

    match district.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(representative(region)),
        Some(d) if d == ALL_DISTRICTS || d.eq_ignore_ascii_case("all") => {
            Ok(representative(region))
        }
        Some(d) => region
            .districts
            .iter()
            .find(|s| s.name == d)
            .map(|site| RegionSite {
                label: format!("{} {}", region.name, site.name),
                site,
            })
            .ok_or_else(|| {
                StyleError::validation(format!(
                    "Unknown district '{d}' in {}. Choose one of: {}",
                    region.name,
                    district_names(region).join(", ")
                ))
            }),
    }
}

/// District choices of a region, starting with [`ALL_DISTRICTS`]
#[must_use]
pub fn district_names(region: &Region) -> Vec<&'static str> {
    std::iter::once(ALL_DISTRICTS)
        .chain(region.districts.iter().map(|s| s.name))
        .collect()
}

/// District choices of the region named `region`
pub fn districts(region: &str) -> Result<Vec<&'static str>> {
    find_region(region).map(district_names)
}

fn representative(region: &'static Region) -> RegionSite {
    RegionSite {
        label: region.name.to_string(),
        site: &region.representative,
    }
}
