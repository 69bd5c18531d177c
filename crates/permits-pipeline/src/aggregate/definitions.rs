//! The nine published aggregates.

use permits_core::catalog::{
  Dimension::{ApprovalType as Type, Source, Year, Zip},
  names,
};

use super::spec::{
  AggregateSpec, GroupMeasure as G, Key, Measure, MeasureKind as M, Order,
  RowFilter, Units, measure, per_group,
};

const PERMIT_COUNT: Measure = per_group("permit_count", G::Count);
const TOTAL_DU: Measure = per_group("total_du", G::SumUnits(Units::Total));
const TOTAL_VALUATION: Measure = per_group("total_valuation", G::SumValuation);

pub const SPECS: &[AggregateSpec] = &[
  AggregateSpec {
    name:       names::PERMIT_VOLUME_MONTHLY,
    keys:       &[Key::Year, Key::Month, Key::ApprovalType, Key::Source],
    filters:    &[],
    measures:   &[PERMIT_COUNT],
    order:      Order::Keys,
    dimensions: &[Year, Type, Source],
  },
  AggregateSpec {
    name:       names::HOUSING_UNITS_BY_YEAR,
    keys:       &[Key::Year],
    filters:    &[RowFilter::IsHousing],
    measures:   &[
      per_group("du_extremely_low", G::SumUnits(Units::ExtremelyLow)),
      per_group("du_very_low", G::SumUnits(Units::VeryLow)),
      per_group("du_low", G::SumUnits(Units::Low)),
      per_group("du_moderate", G::SumUnits(Units::Moderate)),
      per_group("du_above_moderate", G::SumUnits(Units::AboveModerate)),
      per_group("adu_total", G::SumUnits(Units::Adu)),
      per_group("jadu_total", G::SumUnits(Units::Jadu)),
      TOTAL_DU,
    ],
    order:      Order::Keys,
    dimensions: &[Year],
  },
  AggregateSpec {
    name:       names::APPROVAL_TIMELINES,
    keys:       &[Key::Year, Key::ApprovalType, Key::Zip],
    filters:    &[RowFilter::HasApprovalDays],
    measures:   &[
      PERMIT_COUNT,
      measure("median_days", M::MedianDays),
      per_group("avg_days", G::AvgDays),
      per_group("p90_days", G::QuantileDays(0.9)),
    ],
    order:      Order::Keys,
    dimensions: &[Year, Type, Zip],
  },
  AggregateSpec {
    name:       names::SOLAR_PERMITS_MONTHLY,
    keys:       &[Key::Year, Key::Month, Key::Zip],
    filters:    &[RowFilter::IsSolar],
    measures:   &[
      PERMIT_COUNT,
      measure("cumulative_total", M::RunningCount { partition: Key::Zip }),
    ],
    order:      Order::Keys,
    dimensions: &[Year, Zip],
  },
  AggregateSpec {
    name:       names::MAP_POINTS,
    keys:       &[Key::Year, Key::ApprovalType, Key::Zip, Key::Lat, Key::Lng],
    filters:    &[RowFilter::HasLocation],
    measures:   &[
      PERMIT_COUNT,
      TOTAL_DU,
      TOTAL_VALUATION,
      per_group("housing_count", G::CountWhere(RowFilter::IsHousing)),
      per_group("solar_count", G::CountWhere(RowFilter::IsSolar)),
    ],
    order:      Order::Keys,
    dimensions: &[Year, Type, Zip],
  },
  AggregateSpec {
    name:       names::TOP_PERMIT_TYPES,
    keys:       &[Key::ApprovalType],
    filters:    &[],
    measures:   &[
      PERMIT_COUNT,
      per_group("avg_valuation", G::AvgValuation),
      measure("median_approval_days", M::MedianDays),
    ],
    order:      Order::CountDesc,
    dimensions: &[Type],
  },
  AggregateSpec {
    name:       names::CONSTRUCTION_BY_ZIP,
    keys:       &[Key::Zip, Key::Year],
    filters:    &[RowFilter::HasZip],
    measures:   &[PERMIT_COUNT, TOTAL_VALUATION, TOTAL_DU],
    order:      Order::Keys,
    dimensions: &[Zip, Year],
  },
  AggregateSpec {
    name:       names::BC_CODE_SUMMARY,
    keys:       &[
      Key::Year,
      Key::Source,
      Key::BcCode,
      Key::BcCodeDescription,
    ],
    filters:    &[RowFilter::HasBcCode],
    measures:   &[PERMIT_COUNT, TOTAL_DU, TOTAL_VALUATION],
    order:      Order::CountDesc,
    dimensions: &[Year, Source],
  },
  AggregateSpec {
    name:       names::PERMIT_SUMMARY,
    keys:       &[Key::Year, Key::ApprovalType, Key::Zip, Key::Source],
    filters:    &[],
    measures:   &[
      PERMIT_COUNT,
      TOTAL_DU,
      TOTAL_VALUATION,
      per_group("count_with_days", G::CountWithDays),
      per_group("sum_approval_days", G::SumDays),
      measure("median_approval_days", M::MedianDays),
    ],
    order:      Order::Keys,
    dimensions: &[Year, Type, Zip, Source],
  },
];
