//! The key-value and dataframe paths agree on generated data

use tally_core::{ContextConfig, DistributedDataset, TallyContext};
use tally_jobs::table_stats::{avg_salary_by_key, count_by_key};
use tally_jobs::{Employee, EmployeeGenerator, KeyValueStats, TableStats};

fn context(parallelism: usize) -> TallyContext {
    TallyContext::new(ContextConfig::new("aggregation-test").with_parallelism(parallelism)).unwrap()
}

#[tokio::test]
async fn test_paths_agree_on_generated_records() {
    let records = EmployeeGenerator::seeded(11).generate(1_000).unwrap();
    let context = context(4);
    let employees = context.parallelize(records);

    let kv = KeyValueStats::compute(&employees).unwrap();
    let tables = TableStats::build(&employees.to_dataframe("employees").unwrap()).unwrap();
    let departments = tables.department_stats.collect().await.unwrap();
    let ages = tables.age_stats.collect().await.unwrap();

    let table_departments = avg_salary_by_key(&departments, "department").unwrap();
    assert_eq!(
        kv.department_avg_salary.keys().collect::<Vec<_>>(),
        table_departments.keys().collect::<Vec<_>>()
    );
    for (department, avg) in &kv.department_avg_salary {
        assert!((avg - table_departments[department]).abs() < 1e-6);
    }

    let table_ages = avg_salary_by_key(&ages, "age_group").unwrap();
    let table_counts = count_by_key(&ages, "age_group", "count").unwrap();
    for (group, stats) in &kv.age_group_stats {
        assert!((stats.avg_salary - table_ages[group]).abs() < 1e-6);
        assert_eq!(stats.count as i64, table_counts[group]);
    }
}

#[test]
fn test_results_independent_of_partitioning() {
    let records = EmployeeGenerator::seeded(5).generate(300).unwrap();
    let baseline = {
        let context = context(1);
        KeyValueStats::compute(&context.parallelize_with_partitions(records.clone(), 1)).unwrap()
    };

    for partitions in [3, 8] {
        let context = context(partitions);
        let stats =
            KeyValueStats::compute(&context.parallelize_with_partitions(records.clone(), partitions))
                .unwrap();
        assert_eq!(stats.high_salary_count, baseline.high_salary_count);
        assert_eq!(stats.age_group_stats.len(), baseline.age_group_stats.len());
        for (department, avg) in &baseline.department_avg_salary {
            assert!((avg - stats.department_avg_salary[department]).abs() < 1e-9);
        }
    }
}

#[test]
fn test_single_record() {
    let context = context(2);
    let rdd = context.parallelize(vec![Employee::new(7, "Eve", 64, 150_000, "Finance")]);
    let stats = KeyValueStats::compute(&rdd).unwrap();

    assert_eq!(stats.high_salary_count, 1);
    assert_eq!(stats.department_avg_salary["Finance"], 150_000.0);
    assert_eq!(stats.age_group_stats["Senior"].count, 1);
    assert_eq!(stats.age_group_stats.len(), 1);
}
